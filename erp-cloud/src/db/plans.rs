use shared::billing::Plan;
use sqlx::PgPool;

const COLUMNS: &str = "id, name, description, price::float8 AS price, currency, billing_interval,
    features, active, sort_order";

pub async fn list(pool: &PgPool) -> Result<Vec<Plan>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM plans ORDER BY sort_order, id");
    sqlx::query_as::<_, Plan>(&sql).fetch_all(pool).await
}

pub async fn find_by_id(pool: &PgPool, plan_id: &str) -> Result<Option<Plan>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM plans WHERE id = $1");
    sqlx::query_as::<_, Plan>(&sql)
        .bind(plan_id)
        .fetch_optional(pool)
        .await
}
