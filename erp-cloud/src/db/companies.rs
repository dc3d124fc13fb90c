use shared::billing::{Company, CompanyRole, Membership, UserProfile};
use sqlx::PgPool;

use super::CompanyMembership;

pub async fn find_by_id(pool: &PgPool, company_id: &str) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, owner_id, created_at FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_user(pool: &PgPool, user_id: &str) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, full_name FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_membership(
    pool: &PgPool,
    company_id: &str,
    user_id: &str,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as(
        "SELECT company_id, user_id, role, created_at FROM company_users
         WHERE company_id = $1 AND user_id = $2",
    )
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Insert-if-absent; returns whether a row was written
pub async fn ensure_membership(pool: &PgPool, m: &Membership) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO company_users (company_id, user_id, role, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (company_id, user_id) DO NOTHING",
    )
    .bind(&m.company_id)
    .bind(&m.user_id)
    .bind(m.role)
    .bind(m.created_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    id: String,
    name: String,
    owner_id: String,
    created_at: i64,
    role: CompanyRole,
}

pub async fn memberships_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<CompanyMembership>, sqlx::Error> {
    let rows: Vec<MembershipRow> = sqlx::query_as(
        "SELECT c.id, c.name, c.owner_id, c.created_at, cu.role
         FROM company_users cu
         JOIN companies c ON c.id = cu.company_id
         WHERE cu.user_id = $1
         ORDER BY c.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CompanyMembership {
            company: Company {
                id: r.id,
                name: r.name,
                owner_id: r.owner_id,
                created_at: r.created_at,
            },
            role: r.role,
        })
        .collect())
}
