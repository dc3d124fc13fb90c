//! Audit log and webhook idempotency records

use sqlx::PgPool;

/// Write an audit log entry
pub async fn log(
    pool: &PgPool,
    company_id: &str,
    action: &str,
    detail: Option<&serde_json::Value>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (company_id, action, detail, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(company_id)
    .bind(action)
    .bind(detail)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// INSERT first and check rows_affected, so two deliveries of the same
/// notification cannot both pass.
pub async fn record_webhook_event(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a recorded event so a redelivery is processed again
pub async fn forget_webhook_event(pool: &PgPool, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
