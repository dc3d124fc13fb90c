//! Plan-based feature gating

use serde::Serialize;
use shared::billing::{Feature, Plan, Subscription, SubscriptionStatus};

use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Result of a feature check. A denial is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Access {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Cheapest plan that unlocks the feature, when the plan is the blocker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_plan: Option<&'static str>,
}

impl Access {
    fn granted() -> Self {
        Self {
            allowed: true,
            message: None,
            required_plan: None,
        }
    }

    fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: Some(message.into()),
            required_plan: None,
        }
    }
}

/// Decide whether `feature` is usable under `subscription` and its `plan`
pub fn can_access(
    feature: Feature,
    subscription: Option<&Subscription>,
    plan: Option<&Plan>,
    now: i64,
) -> Access {
    let Some(sub) = subscription else {
        return Access::denied("No active subscription. Choose a plan to continue.");
    };

    match sub.effective_status(now) {
        SubscriptionStatus::Active => {}
        SubscriptionStatus::Expired => {
            return Access::denied("Your subscription has expired. Renew it to continue.");
        }
        SubscriptionStatus::Cancelled => {
            return Access::denied("Your subscription was cancelled.");
        }
        SubscriptionStatus::Pending => {
            return Access::denied("Your subscription is waiting for payment confirmation.");
        }
    }

    match plan {
        Some(plan) if plan.id == sub.plan_id && plan.has_feature(feature) => Access::granted(),
        Some(_) => Access {
            allowed: false,
            message: Some(format!(
                "{} is available from the {} plan. Upgrade to unlock it.",
                feature.label(),
                feature.minimum_plan()
            )),
            required_plan: Some(feature.minimum_plan()),
        },
        None => Access::denied("Your subscription plan is no longer available."),
    }
}

/// Look up the company's subscription and plan, then apply [`can_access`].
/// Read-only.
pub async fn check_feature(
    store: &dyn BillingStore,
    company_id: &str,
    feature: Feature,
    now: i64,
) -> ServiceResult<Access> {
    let Some(sub) = store.find_open_subscription(company_id).await? else {
        return Ok(can_access(feature, None, None, now));
    };
    let plan = store.find_plan(&sub.plan_id).await?;
    Ok(can_access(feature, Some(&sub), plan.as_ref(), now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::catalog::default_plans;
    use crate::billing::fixtures::{self, NOW, principal};
    use crate::billing::trial::ensure_trial;

    fn sub(plan_id: &str, status: SubscriptionStatus, end: i64) -> Subscription {
        Subscription {
            id: "s1".into(),
            company_id: "c1".into(),
            plan_id: plan_id.into(),
            status,
            current_period_start: 0,
            current_period_end: end,
            cancel_at_period_end: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn plan(id: &str) -> Plan {
        default_plans("ARS").into_iter().find(|p| p.id == id).unwrap()
    }

    #[test]
    fn no_subscription_is_denied() {
        let access = can_access(Feature::Inventory, None, None, NOW);
        assert!(!access.allowed);
        assert!(access.message.unwrap().contains("No active subscription"));
    }

    #[test]
    fn allowed_iff_plan_has_feature() {
        let s = sub("basic", SubscriptionStatus::Active, NOW + 1);
        let basic = plan("basic");
        for feature in Feature::ALL {
            let access = can_access(feature, Some(&s), Some(&basic), NOW);
            assert_eq!(access.allowed, basic.has_feature(feature), "{}", feature.key());
        }
    }

    #[test]
    fn granting_then_revoking_a_flag_flips_access() {
        for base in default_plans("ARS") {
            let s = sub(&base.id, SubscriptionStatus::Active, NOW + 1);
            for feature in Feature::ALL {
                let mut p = base.clone();
                p.features.retain(|f| f != feature.key());
                let others: Vec<bool> = Feature::ALL
                    .iter()
                    .filter(|f| **f != feature)
                    .map(|f| can_access(*f, Some(&s), Some(&p), NOW).allowed)
                    .collect();
                assert!(!can_access(feature, Some(&s), Some(&p), NOW).allowed);

                p.features.push(feature.key().to_string());
                assert!(
                    can_access(feature, Some(&s), Some(&p), NOW).allowed,
                    "{} on {}",
                    feature.key(),
                    base.id
                );
                let others_after: Vec<bool> = Feature::ALL
                    .iter()
                    .filter(|f| **f != feature)
                    .map(|f| can_access(*f, Some(&s), Some(&p), NOW).allowed)
                    .collect();
                assert_eq!(others, others_after);

                p.features.retain(|f| f != feature.key());
                assert!(!can_access(feature, Some(&s), Some(&p), NOW).allowed);
            }
        }
    }

    #[test]
    fn denial_names_minimum_plan() {
        let s = sub("basic", SubscriptionStatus::Active, NOW + 1);
        let access = can_access(Feature::Reports, Some(&s), Some(&plan("basic")), NOW);
        assert!(!access.allowed);
        assert_eq!(access.required_plan, Some("pro"));
        assert!(access.message.unwrap().contains("pro plan"));
    }

    #[test]
    fn ended_period_reads_as_expired() {
        let s = sub("enterprise", SubscriptionStatus::Active, NOW);
        let access = can_access(Feature::Inventory, Some(&s), Some(&plan("enterprise")), NOW);
        assert!(!access.allowed);
        assert!(access.message.unwrap().contains("expired"));
    }

    #[test]
    fn cancelled_and_pending_are_denied() {
        let enterprise = plan("enterprise");
        for status in [SubscriptionStatus::Cancelled, SubscriptionStatus::Pending] {
            let s = sub("enterprise", status, NOW + 1_000);
            assert!(!can_access(Feature::Sales, Some(&s), Some(&enterprise), NOW).allowed);
        }
    }

    #[tokio::test]
    async fn check_feature_does_not_mutate() {
        let store = fixtures::store().await;
        let access = check_feature(&store, "c1", Feature::Inventory, NOW)
            .await
            .unwrap();
        assert!(!access.allowed);
        assert!(store.subscriptions_for("c1").await.is_empty());

        ensure_trial(&store, &principal("owner"), "c1", NOW)
            .await
            .unwrap();
        let before = store.subscriptions_for("c1").await;
        assert!(
            check_feature(&store, "c1", Feature::Inventory, NOW)
                .await
                .unwrap()
                .allowed
        );
        assert!(
            !check_feature(&store, "c1", Feature::Reports, NOW)
                .await
                .unwrap()
                .allowed
        );
        assert_eq!(store.subscriptions_for("c1").await, before);
    }
}
