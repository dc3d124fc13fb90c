use shared::billing::{Subscription, SubscriptionStatus};
use sqlx::{PgPool, Postgres, Transaction};

use super::PlanActivation;

const COLUMNS: &str = "id, company_id, plan_id, status, current_period_start, current_period_end,
    cancel_at_period_end, created_at, updated_at";

/// Insert unless the company already has an `active`/`pending` row.
///
/// Relies on the partial unique index `subscriptions_one_open_per_company`;
/// returns `None` when the insert lost to an existing open subscription.
pub async fn insert_if_none_open(
    pool: &PgPool,
    sub: &Subscription,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO subscriptions (id, company_id, plan_id, status, current_period_start,
            current_period_end, cancel_at_period_end, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (company_id) WHERE status IN ('active', 'pending') DO NOTHING
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(&sub.id)
        .bind(&sub.company_id)
        .bind(&sub.plan_id)
        .bind(sub.status)
        .bind(sub.current_period_start)
        .bind(sub.current_period_end)
        .bind(sub.cancel_at_period_end)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .fetch_optional(pool)
        .await
}

/// Get the company's current open subscription
pub async fn find_open(
    pool: &PgPool,
    company_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM subscriptions
         WHERE company_id = $1 AND status IN ('active', 'pending')
         ORDER BY created_at DESC
         LIMIT 1"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(company_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(
    pool: &PgPool,
    subscription_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM subscriptions WHERE id = $1");
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(subscription_id)
        .fetch_optional(pool)
        .await
}

/// Cancel unless already cancelled. Returns the updated row, or `None` when
/// nothing changed (missing or already cancelled).
pub async fn cancel(
    pool: &PgPool,
    subscription_id: &str,
    now: i64,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        "UPDATE subscriptions
         SET status = 'cancelled', cancel_at_period_end = FALSE,
             current_period_end = $2, updated_at = $2
         WHERE id = $1 AND status <> 'cancelled'
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(subscription_id)
        .bind(now)
        .fetch_optional(pool)
        .await
}

/// Move the open subscription onto a paid plan, or insert a new active one.
///
/// A concurrent activation can win the insert; the row it wrote is then
/// locked and updated instead.
pub async fn activate_plan(
    pool: &PgPool,
    new_id: &str,
    activation: &PlanActivation<'_>,
) -> Result<Subscription, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let sub = match lock_open(&mut tx, activation.company_id).await? {
        Some(existing) => move_to_plan(&mut tx, &existing.id, activation).await?,
        None => {
            let sql = format!(
                "INSERT INTO subscriptions (id, company_id, plan_id, status, current_period_start,
                    current_period_end, cancel_at_period_end, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $7)
                 ON CONFLICT (company_id) WHERE status IN ('active', 'pending') DO NOTHING
                 RETURNING {COLUMNS}"
            );
            let inserted: Option<Subscription> = sqlx::query_as(&sql)
                .bind(new_id)
                .bind(activation.company_id)
                .bind(activation.plan_id)
                .bind(SubscriptionStatus::Active)
                .bind(activation.period_start)
                .bind(activation.period_end)
                .bind(activation.now)
                .fetch_optional(&mut *tx)
                .await?;
            match inserted {
                Some(sub) => sub,
                None => {
                    let existing = lock_open(&mut tx, activation.company_id)
                        .await?
                        .ok_or(sqlx::Error::RowNotFound)?;
                    move_to_plan(&mut tx, &existing.id, activation).await?
                }
            }
        }
    };

    tx.commit().await?;
    Ok(sub)
}

async fn lock_open(
    tx: &mut Transaction<'_, Postgres>,
    company_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM subscriptions
         WHERE company_id = $1 AND status IN ('active', 'pending')
         FOR UPDATE"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await
}

async fn move_to_plan(
    tx: &mut Transaction<'_, Postgres>,
    subscription_id: &str,
    activation: &PlanActivation<'_>,
) -> Result<Subscription, sqlx::Error> {
    let sql = format!(
        "UPDATE subscriptions
         SET plan_id = $2, status = 'active', current_period_start = $3,
             current_period_end = $4, cancel_at_period_end = FALSE, updated_at = $5
         WHERE id = $1
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(subscription_id)
        .bind(activation.plan_id)
        .bind(activation.period_start)
        .bind(activation.period_end)
        .bind(activation.now)
        .fetch_one(&mut **tx)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM subscriptions ORDER BY created_at DESC");
    sqlx::query_as::<_, Subscription>(&sql).fetch_all(pool).await
}

pub async fn ending_between(
    pool: &PgPool,
    from: i64,
    to: i64,
) -> Result<Vec<Subscription>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM subscriptions
         WHERE status = 'active' AND current_period_end >= $1 AND current_period_end < $2
         ORDER BY current_period_end"
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
}
