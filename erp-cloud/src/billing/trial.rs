//! Trial provisioning

use serde::Serialize;
use shared::billing::{
    CompanyRole, Membership, Subscription, SubscriptionStatus, TRIAL_PERIOD_DAYS,
};
use shared::error::{AppError, ErrorCode};
use shared::util::DAY_MS;

use super::catalog::select_trial_plan;
use crate::auth::Principal;
use crate::db::{BillingStore, InsertOutcome};
use crate::error::ServiceResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "subscription", rename_all = "snake_case")]
pub enum TrialOutcome {
    /// The company already had an open subscription
    Existing(Subscription),
    /// A trial subscription was written by this call
    Created(Subscription),
    /// No trial plan in the catalog; nothing was written
    NoTrialPlan,
}

impl TrialOutcome {
    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Existing(sub) | Self::Created(sub) => Some(sub),
            Self::NoTrialPlan => None,
        }
    }
}

/// Make sure the caller is linked to the company. Only the registered owner
/// may be linked lazily.
async fn ensure_caller_membership(
    store: &dyn BillingStore,
    principal: &Principal,
    company_id: &str,
    now: i64,
) -> ServiceResult<()> {
    let company = store
        .find_company(company_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CompanyNotFound))?;

    if store
        .find_membership(company_id, &principal.user_id)
        .await?
        .is_some()
    {
        return Ok(());
    }
    if company.owner_id != principal.user_id {
        return Err(AppError::new(ErrorCode::NotCompanyMember).into());
    }

    let membership = Membership {
        company_id: company_id.to_string(),
        user_id: principal.user_id.clone(),
        role: CompanyRole::Owner,
        created_at: now,
    };
    if store.ensure_membership(&membership).await? {
        tracing::info!(company_id, user_id = %principal.user_id, "Linked owner membership");
    }
    Ok(())
}

/// Return the company's open subscription, creating a trial when it has none.
pub async fn ensure_trial(
    store: &dyn BillingStore,
    principal: &Principal,
    company_id: &str,
    now: i64,
) -> ServiceResult<TrialOutcome> {
    if company_id.trim().is_empty() {
        return Err(AppError::required("company_id").into());
    }
    ensure_caller_membership(store, principal, company_id, now).await?;

    if let Some(existing) = store.find_open_subscription(company_id).await? {
        return Ok(TrialOutcome::Existing(existing));
    }

    let plans = store.list_plans().await?;
    let Some(plan) = select_trial_plan(&plans) else {
        tracing::warn!(company_id, "No trial plan in catalog, skipping provisioning");
        return Ok(TrialOutcome::NoTrialPlan);
    };

    let sub = Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        plan_id: plan.id.clone(),
        status: SubscriptionStatus::Active,
        current_period_start: now,
        current_period_end: now + TRIAL_PERIOD_DAYS * DAY_MS,
        cancel_at_period_end: false,
        created_at: now,
        updated_at: now,
    };

    match store.insert_subscription_if_none_open(&sub).await? {
        InsertOutcome::Created(sub) => {
            tracing::info!(
                company_id,
                subscription_id = %sub.id,
                plan_id = %sub.plan_id,
                "Trial subscription created"
            );
            let detail = serde_json::json!({ "subscription_id": sub.id, "plan_id": sub.plan_id });
            store
                .audit(company_id, "trial_started", Some(&detail), now)
                .await?;
            Ok(TrialOutcome::Created(sub))
        }
        InsertOutcome::Existing(sub) => Ok(TrialOutcome::Existing(sub)),
    }
}
