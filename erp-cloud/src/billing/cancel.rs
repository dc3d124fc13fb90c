//! Explicit subscription cancellation

use shared::billing::{Subscription, SubscriptionStatus};
use shared::error::{AppError, ErrorCode};

use super::require_member;
use crate::auth::Principal;
use crate::db::BillingStore;
use crate::error::ServiceResult;

#[derive(Debug, Clone, PartialEq)]
pub struct Cancellation {
    pub subscription: Subscription,
    /// `false` when the subscription was already cancelled
    pub changed: bool,
}

/// Cancel a company's subscription immediately. Owners and admins only.
pub async fn cancel_subscription(
    store: &dyn BillingStore,
    principal: &Principal,
    company_id: &str,
    subscription_id: &str,
    now: i64,
) -> ServiceResult<Cancellation> {
    let (_company, membership) = require_member(store, principal, company_id).await?;
    if !membership.role.can_manage_billing() {
        tracing::warn!(
            company_id,
            user_id = %principal.user_id,
            role = membership.role.as_db(),
            "Cancellation rejected for role"
        );
        return Err(AppError::new(ErrorCode::RoleRequired).into());
    }

    let not_found = || {
        AppError::new(ErrorCode::SubscriptionNotFound).with_detail("subscription_id", subscription_id)
    };
    let sub = store
        .find_subscription(subscription_id)
        .await?
        .filter(|s| s.company_id == company_id)
        .ok_or_else(not_found)?;

    if sub.status == SubscriptionStatus::Cancelled {
        return Ok(Cancellation {
            subscription: sub,
            changed: false,
        });
    }
    let current = sub.effective_status(now);
    if !current.can_transition_to(SubscriptionStatus::Cancelled) {
        return Err(AppError::new(ErrorCode::SubscriptionNotCancellable)
            .with_detail("subscription_id", subscription_id)
            .with_detail("status", current.as_db())
            .into());
    }

    let updated = store
        .cancel_subscription(subscription_id, now)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        company_id,
        subscription_id,
        user_id = %principal.user_id,
        "Subscription cancelled"
    );
    let detail = serde_json::json!({
        "subscription_id": subscription_id,
        "previous_status": sub.status.as_db(),
        "user_id": principal.user_id,
    });
    store
        .audit(company_id, "subscription_cancelled", Some(&detail), now)
        .await?;

    Ok(Cancellation {
        subscription: updated,
        changed: true,
    })
}
