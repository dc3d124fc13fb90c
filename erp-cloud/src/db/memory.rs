//! In-process [`BillingStore`] used for local development and tests
//!
//! Every operation takes the single lock for its whole duration, so the
//! conditional subscription insert is atomic here as well.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use shared::billing::{
    Company, CompanyRole, Membership, Payment, Plan, Subscription, SubscriptionStatus, UserProfile,
};
use tokio::sync::RwLock;

use super::{BillingStore, CompanyMembership, InsertOutcome, PaymentUpdate, PlanActivation};
use crate::error::ServiceResult;

/// Audit entry as recorded by the in-memory store
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub company_id: String,
    pub action: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: i64,
}

#[derive(Default)]
struct Inner {
    plans: Vec<Plan>,
    companies: HashMap<String, Company>,
    users: HashMap<String, UserProfile>,
    memberships: Vec<Membership>,
    subscriptions: Vec<Subscription>,
    payments: Vec<Payment>,
    webhook_events: HashSet<String>,
    audit: Vec<AuditRecord>,
}

impl Inner {
    fn open_subscription(&self, company_id: &str) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.company_id == company_id && s.status.is_open())
            .max_by_key(|s| s.created_at)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new(plans: Vec<Plan>) -> Self {
        let mut inner = Inner {
            plans,
            ..Default::default()
        };
        inner.plans.sort_by_key(|p| p.sort_order);
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub async fn insert_company(&self, company: Company) {
        let mut inner = self.inner.write().await;
        inner.companies.insert(company.id.clone(), company);
    }

    pub async fn insert_user(&self, user: UserProfile) {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id.clone(), user);
    }

    pub async fn insert_membership(&self, membership: Membership) {
        let mut inner = self.inner.write().await;
        inner
            .memberships
            .retain(|m| !(m.company_id == membership.company_id && m.user_id == membership.user_id));
        inner.memberships.push(membership);
    }

    #[cfg(test)]
    pub async fn insert_plan(&self, plan: Plan) {
        let mut inner = self.inner.write().await;
        inner.plans.push(plan);
        inner.plans.sort_by_key(|p| p.sort_order);
    }

    /// Write a subscription row unconditionally
    pub async fn insert_subscription(&self, sub: Subscription) {
        self.inner.write().await.subscriptions.push(sub);
    }

    pub async fn subscriptions_for(&self, company_id: &str) -> Vec<Subscription> {
        self.inner
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.inner.read().await.payments.clone()
    }

    pub async fn audit_entries(&self) -> Vec<AuditRecord> {
        self.inner.read().await.audit.clone()
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn list_plans(&self) -> ServiceResult<Vec<Plan>> {
        Ok(self.inner.read().await.plans.clone())
    }

    async fn find_plan(&self, plan_id: &str) -> ServiceResult<Option<Plan>> {
        let inner = self.inner.read().await;
        Ok(inner.plans.iter().find(|p| p.id == plan_id).cloned())
    }

    async fn find_company(&self, company_id: &str) -> ServiceResult<Option<Company>> {
        Ok(self.inner.read().await.companies.get(company_id).cloned())
    }

    async fn find_user(&self, user_id: &str) -> ServiceResult<Option<UserProfile>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn find_membership(
        &self,
        company_id: &str,
        user_id: &str,
    ) -> ServiceResult<Option<Membership>> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .iter()
            .find(|m| m.company_id == company_id && m.user_id == user_id)
            .cloned())
    }

    async fn ensure_membership(&self, membership: &Membership) -> ServiceResult<bool> {
        let mut inner = self.inner.write().await;
        let exists = inner
            .memberships
            .iter()
            .any(|m| m.company_id == membership.company_id && m.user_id == membership.user_id);
        if exists {
            return Ok(false);
        }
        inner.memberships.push(membership.clone());
        Ok(true)
    }

    async fn memberships_for_user(&self, user_id: &str) -> ServiceResult<Vec<CompanyMembership>> {
        let inner = self.inner.read().await;
        let mut out: Vec<CompanyMembership> = inner
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                inner.companies.get(&m.company_id).map(|c| CompanyMembership {
                    company: c.clone(),
                    role: m.role,
                })
            })
            .collect();
        out.sort_by(|a, b| a.company.name.cmp(&b.company.name));
        Ok(out)
    }

    async fn find_open_subscription(
        &self,
        company_id: &str,
    ) -> ServiceResult<Option<Subscription>> {
        Ok(self.inner.read().await.open_subscription(company_id).cloned())
    }

    async fn find_subscription(
        &self,
        subscription_id: &str,
    ) -> ServiceResult<Option<Subscription>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned())
    }

    async fn insert_subscription_if_none_open(
        &self,
        sub: &Subscription,
    ) -> ServiceResult<InsertOutcome> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.open_subscription(&sub.company_id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        inner.subscriptions.push(sub.clone());
        Ok(InsertOutcome::Created(sub.clone()))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        now: i64,
    ) -> ServiceResult<Option<Subscription>> {
        let mut inner = self.inner.write().await;
        let Some(sub) = inner
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
        else {
            return Ok(None);
        };
        if sub.status != SubscriptionStatus::Cancelled {
            sub.status = SubscriptionStatus::Cancelled;
            sub.cancel_at_period_end = false;
            sub.current_period_end = now;
            sub.updated_at = now;
        }
        Ok(Some(sub.clone()))
    }

    async fn activate_plan(&self, activation: &PlanActivation<'_>) -> ServiceResult<Subscription> {
        let mut inner = self.inner.write().await;
        let open_id = inner
            .open_subscription(activation.company_id)
            .map(|s| s.id.clone());

        if let Some(id) = open_id
            && let Some(sub) = inner.subscriptions.iter_mut().find(|s| s.id == id)
        {
            sub.plan_id = activation.plan_id.to_string();
            sub.status = SubscriptionStatus::Active;
            sub.current_period_start = activation.period_start;
            sub.current_period_end = activation.period_end;
            sub.cancel_at_period_end = false;
            sub.updated_at = activation.now;
            return Ok(sub.clone());
        }

        let sub = Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: activation.company_id.to_string(),
            plan_id: activation.plan_id.to_string(),
            status: SubscriptionStatus::Active,
            current_period_start: activation.period_start,
            current_period_end: activation.period_end,
            cancel_at_period_end: false,
            created_at: activation.now,
            updated_at: activation.now,
        };
        inner.subscriptions.push(sub.clone());
        Ok(sub)
    }

    async fn list_subscriptions(&self) -> ServiceResult<Vec<Subscription>> {
        let mut subs = self.inner.read().await.subscriptions.clone();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    async fn subscriptions_ending_between(
        &self,
        from: i64,
        to: i64,
    ) -> ServiceResult<Vec<Subscription>> {
        let inner = self.inner.read().await;
        let mut subs: Vec<Subscription> = inner
            .subscriptions
            .iter()
            .filter(|s| {
                s.status == SubscriptionStatus::Active
                    && s.current_period_end >= from
                    && s.current_period_end < to
            })
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.current_period_end);
        Ok(subs)
    }

    async fn insert_payment(&self, payment: &Payment) -> ServiceResult<()> {
        self.inner.write().await.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> ServiceResult<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.external_reference == external_reference)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn update_payment(&self, update: &PaymentUpdate<'_>) -> ServiceResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(p) = inner.payments.iter_mut().find(|p| p.id == update.payment_id) {
            p.status = update.status;
            if let Some(kind) = update.payment_type {
                p.payment_type = Some(kind.to_string());
            }
            p.external_payment_id = Some(update.external_payment_id.to_string());
            p.updated_at = update.now;
        }
        Ok(())
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        _event_type: &str,
        _now: i64,
    ) -> ServiceResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .webhook_events
            .insert(event_id.to_string()))
    }

    async fn forget_webhook_event(&self, event_id: &str) -> ServiceResult<()> {
        self.inner.write().await.webhook_events.remove(event_id);
        Ok(())
    }

    async fn audit(
        &self,
        company_id: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        now: i64,
    ) -> ServiceResult<()> {
        self.inner.write().await.audit.push(AuditRecord {
            company_id: company_id.to_string(),
            action: action.to_string(),
            detail: detail.cloned(),
            created_at: now,
        });
        Ok(())
    }
}

/// Seed a store with the default catalog and one demo company owned by
/// `dev-user`, for running the service without PostgreSQL.
pub async fn development_store(plans: Vec<Plan>, owner_email: &str) -> InMemoryStore {
    let store = InMemoryStore::new(plans);
    let now = shared::util::now_millis();
    store
        .insert_user(UserProfile {
            id: "dev-user".into(),
            email: owner_email.to_string(),
            full_name: Some("Development Owner".into()),
        })
        .await;
    store
        .insert_company(Company {
            id: "demo".into(),
            name: "Demo Company".into(),
            owner_id: "dev-user".into(),
            created_at: now,
        })
        .await;
    store
        .insert_membership(Membership {
            company_id: "demo".into(),
            user_id: "dev-user".into(),
            role: CompanyRole::Owner,
            created_at: now,
        })
        .await;
    store
}
