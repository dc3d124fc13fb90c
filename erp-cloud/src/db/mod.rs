//! Backend access layer
//!
//! All persistence goes through [`BillingStore`]. Handlers receive the store
//! as an explicit handle from [`AppState`](crate::state::AppState) instead of
//! building clients per request.

pub mod audit;
pub mod companies;
pub mod memory;
pub mod payments;
pub mod plans;
pub mod postgres;
pub mod subscriptions;

use async_trait::async_trait;
use serde::Serialize;
use shared::billing::{
    Company, CompanyRole, Membership, Payment, PaymentStatus, Plan, Subscription, UserProfile,
};

use crate::error::ServiceResult;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Result of a conditional subscription insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// No open subscription existed; the new row was written
    Created(Subscription),
    /// The company already had an open subscription; nothing was written
    Existing(Subscription),
}

/// A company the user belongs to, with the user's role in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyMembership {
    pub company: Company,
    pub role: CompanyRole,
}

/// Changes applied to a payment row when the processor reports back
#[derive(Debug, Clone)]
pub struct PaymentUpdate<'a> {
    pub payment_id: &'a str,
    pub status: PaymentStatus,
    pub payment_type: Option<&'a str>,
    pub external_payment_id: &'a str,
    pub now: i64,
}

/// Period and plan written when a paid plan is activated
#[derive(Debug, Clone)]
pub struct PlanActivation<'a> {
    pub company_id: &'a str,
    pub plan_id: &'a str,
    pub period_start: i64,
    pub period_end: i64,
    pub now: i64,
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    // ========== Plans ==========

    /// All plans ordered by `sort_order`
    async fn list_plans(&self) -> ServiceResult<Vec<Plan>>;

    async fn find_plan(&self, plan_id: &str) -> ServiceResult<Option<Plan>>;

    // ========== Companies ==========

    async fn find_company(&self, company_id: &str) -> ServiceResult<Option<Company>>;

    async fn find_user(&self, user_id: &str) -> ServiceResult<Option<UserProfile>>;

    async fn find_membership(
        &self,
        company_id: &str,
        user_id: &str,
    ) -> ServiceResult<Option<Membership>>;

    /// Insert the membership unless the pair already exists. Returns `true`
    /// when a row was written.
    async fn ensure_membership(&self, membership: &Membership) -> ServiceResult<bool>;

    async fn memberships_for_user(&self, user_id: &str) -> ServiceResult<Vec<CompanyMembership>>;

    // ========== Subscriptions ==========

    /// The company's subscription in `active` or `pending`, if any
    async fn find_open_subscription(&self, company_id: &str)
    -> ServiceResult<Option<Subscription>>;

    async fn find_subscription(&self, subscription_id: &str)
    -> ServiceResult<Option<Subscription>>;

    /// Insert `sub` only if the company has no open subscription. The check
    /// and the write are a single atomic step.
    async fn insert_subscription_if_none_open(
        &self,
        sub: &Subscription,
    ) -> ServiceResult<InsertOutcome>;

    /// Mark a subscription cancelled with `current_period_end = now`.
    /// Already-cancelled rows are left untouched. Returns the row as stored
    /// after the call, `None` if it does not exist.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        now: i64,
    ) -> ServiceResult<Option<Subscription>>;

    /// Switch the company's open subscription to a paid plan, or create an
    /// active one when none is open.
    async fn activate_plan(&self, activation: &PlanActivation<'_>) -> ServiceResult<Subscription>;

    async fn list_subscriptions(&self) -> ServiceResult<Vec<Subscription>>;

    /// Active subscriptions whose period ends in `[from, to)`
    async fn subscriptions_ending_between(
        &self,
        from: i64,
        to: i64,
    ) -> ServiceResult<Vec<Subscription>>;

    // ========== Payments ==========

    async fn insert_payment(&self, payment: &Payment) -> ServiceResult<()>;

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> ServiceResult<Option<Payment>>;

    async fn update_payment(&self, update: &PaymentUpdate<'_>) -> ServiceResult<()>;

    // ========== Webhooks / audit ==========

    /// Record a processed notification. Returns `false` if it was seen before.
    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        now: i64,
    ) -> ServiceResult<bool>;

    /// Remove a recorded notification whose processing failed
    async fn forget_webhook_event(&self, event_id: &str) -> ServiceResult<()>;

    async fn audit(
        &self,
        company_id: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        now: i64,
    ) -> ServiceResult<()>;
}
