//! Subscription lifecycle services
//!
//! Each operation takes its collaborators (store, gateway, mailer) and the
//! current time explicitly, so handlers stay thin and tests stay deterministic.

pub mod cancel;
pub mod catalog;
pub mod checkout;
pub mod gate;
pub mod notify;
pub mod reminders;
pub mod trial;
pub mod webhook;

use shared::billing::{Company, Membership};
use shared::error::{AppError, ErrorCode};

use crate::auth::Principal;
use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Load the company and the caller's membership in it.
///
/// Missing company is 404, missing membership is 403.
pub async fn require_member(
    store: &dyn BillingStore,
    principal: &Principal,
    company_id: &str,
) -> ServiceResult<(Company, Membership)> {
    if company_id.trim().is_empty() {
        return Err(AppError::required("company_id").into());
    }
    let company = store
        .find_company(company_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CompanyNotFound))?;
    let membership = store
        .find_membership(company_id, &principal.user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::NotCompanyMember))?;
    Ok((company, membership))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared setup for service tests

    use shared::billing::{Company, CompanyRole, Membership, UserProfile};

    use crate::auth::Principal;
    use crate::db::InMemoryStore;

    pub const NOW: i64 = 1_700_000_000_000;

    pub fn principal(user_id: &str) -> Principal {
        Principal {
            user_id: user_id.into(),
            email: format!("{user_id}@example.com"),
            is_super_admin: false,
        }
    }

    /// Default catalog plus company `c1` owned by `owner`, with `admin`,
    /// `tech` and `member` users in their namesake roles.
    pub async fn store() -> InMemoryStore {
        let store = InMemoryStore::new(super::catalog::default_plans("ARS"));
        for user in ["owner", "admin", "tech", "member", "outsider"] {
            store
                .insert_user(UserProfile {
                    id: user.into(),
                    email: format!("{user}@example.com"),
                    full_name: None,
                })
                .await;
        }
        store
            .insert_company(Company {
                id: "c1".into(),
                name: "Taller Norte".into(),
                owner_id: "owner".into(),
                created_at: 0,
            })
            .await;
        for (user, role) in [
            ("admin", CompanyRole::Admin),
            ("tech", CompanyRole::Technician),
            ("member", CompanyRole::Member),
        ] {
            store
                .insert_membership(Membership {
                    company_id: "c1".into(),
                    user_id: user.into(),
                    role,
                    created_at: 0,
                })
                .await;
        }
        store
    }
}
