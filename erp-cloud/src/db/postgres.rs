//! PostgreSQL-backed [`BillingStore`]

use async_trait::async_trait;
use shared::billing::{Company, Membership, Payment, Plan, Subscription, UserProfile};
use shared::error::AppError;
use sqlx::PgPool;

use super::{
    BillingStore, CompanyMembership, InsertOutcome, PaymentUpdate, PlanActivation, audit,
    companies, payments, plans, subscriptions,
};
use crate::error::ServiceResult;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> Result<Self, crate::error::BoxError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn list_plans(&self) -> ServiceResult<Vec<Plan>> {
        Ok(plans::list(&self.pool).await?)
    }

    async fn find_plan(&self, plan_id: &str) -> ServiceResult<Option<Plan>> {
        Ok(plans::find_by_id(&self.pool, plan_id).await?)
    }

    async fn find_company(&self, company_id: &str) -> ServiceResult<Option<Company>> {
        Ok(companies::find_by_id(&self.pool, company_id).await?)
    }

    async fn find_user(&self, user_id: &str) -> ServiceResult<Option<UserProfile>> {
        Ok(companies::find_user(&self.pool, user_id).await?)
    }

    async fn find_membership(
        &self,
        company_id: &str,
        user_id: &str,
    ) -> ServiceResult<Option<Membership>> {
        Ok(companies::find_membership(&self.pool, company_id, user_id).await?)
    }

    async fn ensure_membership(&self, membership: &Membership) -> ServiceResult<bool> {
        Ok(companies::ensure_membership(&self.pool, membership).await?)
    }

    async fn memberships_for_user(&self, user_id: &str) -> ServiceResult<Vec<CompanyMembership>> {
        Ok(companies::memberships_for_user(&self.pool, user_id).await?)
    }

    async fn find_open_subscription(
        &self,
        company_id: &str,
    ) -> ServiceResult<Option<Subscription>> {
        Ok(subscriptions::find_open(&self.pool, company_id).await?)
    }

    async fn find_subscription(
        &self,
        subscription_id: &str,
    ) -> ServiceResult<Option<Subscription>> {
        Ok(subscriptions::find_by_id(&self.pool, subscription_id).await?)
    }

    async fn insert_subscription_if_none_open(
        &self,
        sub: &Subscription,
    ) -> ServiceResult<InsertOutcome> {
        if let Some(created) = subscriptions::insert_if_none_open(&self.pool, sub).await? {
            return Ok(InsertOutcome::Created(created));
        }
        // Lost to an open row; it can only vanish if cancelled in between.
        subscriptions::find_open(&self.pool, &sub.company_id)
            .await?
            .map(InsertOutcome::Existing)
            .ok_or_else(|| {
                AppError::conflict("Subscription changed concurrently, retry the request").into()
            })
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        now: i64,
    ) -> ServiceResult<Option<Subscription>> {
        match subscriptions::cancel(&self.pool, subscription_id, now).await? {
            Some(updated) => Ok(Some(updated)),
            None => Ok(subscriptions::find_by_id(&self.pool, subscription_id).await?),
        }
    }

    async fn activate_plan(&self, activation: &PlanActivation<'_>) -> ServiceResult<Subscription> {
        let new_id = uuid::Uuid::new_v4().to_string();
        Ok(subscriptions::activate_plan(&self.pool, &new_id, activation).await?)
    }

    async fn list_subscriptions(&self) -> ServiceResult<Vec<Subscription>> {
        Ok(subscriptions::list_all(&self.pool).await?)
    }

    async fn subscriptions_ending_between(
        &self,
        from: i64,
        to: i64,
    ) -> ServiceResult<Vec<Subscription>> {
        Ok(subscriptions::ending_between(&self.pool, from, to).await?)
    }

    async fn insert_payment(&self, payment: &Payment) -> ServiceResult<()> {
        Ok(payments::create(&self.pool, payment).await?)
    }

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> ServiceResult<Option<Payment>> {
        Ok(payments::find_by_reference(&self.pool, external_reference).await?)
    }

    async fn update_payment(&self, update: &PaymentUpdate<'_>) -> ServiceResult<()> {
        Ok(payments::update(&self.pool, update).await?)
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        now: i64,
    ) -> ServiceResult<bool> {
        Ok(audit::record_webhook_event(&self.pool, event_id, event_type, now).await?)
    }

    async fn forget_webhook_event(&self, event_id: &str) -> ServiceResult<()> {
        Ok(audit::forget_webhook_event(&self.pool, event_id).await?)
    }

    async fn audit(
        &self,
        company_id: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        now: i64,
    ) -> ServiceResult<()> {
        Ok(audit::log(&self.pool, company_id, action, detail, now).await?)
    }
}
