use shared::billing::Payment;
use sqlx::PgPool;

use super::PaymentUpdate;

const COLUMNS: &str = "id, company_id, plan_id, preference_id, external_payment_id, amount, currency,
    status, payment_type, external_reference, created_at, updated_at";

pub async fn create(pool: &PgPool, p: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments (id, company_id, plan_id, preference_id, external_payment_id,
            amount, currency, status, payment_type, external_reference, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(&p.id)
    .bind(&p.company_id)
    .bind(&p.plan_id)
    .bind(&p.preference_id)
    .bind(&p.external_payment_id)
    .bind(p.amount)
    .bind(&p.currency)
    .bind(p.status)
    .bind(&p.payment_type)
    .bind(&p.external_reference)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_reference(
    pool: &PgPool,
    external_reference: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM payments WHERE external_reference = $1
         ORDER BY created_at DESC LIMIT 1"
    );
    sqlx::query_as::<_, Payment>(&sql)
        .bind(external_reference)
        .fetch_optional(pool)
        .await
}

pub async fn update(pool: &PgPool, u: &PaymentUpdate<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payments
         SET status = $2, payment_type = COALESCE($3, payment_type),
             external_payment_id = $4, updated_at = $5
         WHERE id = $1",
    )
    .bind(u.payment_id)
    .bind(u.status)
    .bind(u.payment_type)
    .bind(u.external_payment_id)
    .bind(u.now)
    .execute(pool)
    .await?;
    Ok(())
}
