//! Super admin endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};
use serde::Serialize;
use shared::billing::{Subscription, SubscriptionStatus};
use shared::error::{ApiResponse, AppError, ErrorCode};

use super::ApiResult;
use crate::auth::Principal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/subscriptions", get(list_subscriptions))
}

#[derive(Debug, Serialize)]
pub struct AdminSubscription {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub effective_status: SubscriptionStatus,
}

/// GET /api/admin/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<AdminSubscription>> {
    if !principal.is_super_admin {
        tracing::warn!(user_id = %principal.user_id, "Admin listing denied");
        return Err(AppError::new(ErrorCode::SuperAdminRequired));
    }
    let now = shared::util::now_millis();
    let subs = state.store.list_subscriptions().await?;
    Ok(ApiResponse::success(
        subs.into_iter()
            .map(|s| AdminSubscription {
                effective_status: s.effective_status(now),
                subscription: s,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use shared::billing::{Subscription, SubscriptionStatus};

    use super::super::test_support::{Harness, JWT_SECRET};
    use crate::auth::session_auth::create_token;

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let h = Harness::new().await;
        let (status, body) = h.get("/api/admin/subscriptions", Some("owner")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 2003);
    }

    #[tokio::test]
    async fn admin_sees_lazy_expiry() {
        let h = Harness::new().await;
        h.store
            .insert_subscription(Subscription {
                id: "old".into(),
                company_id: "c1".into(),
                plan_id: "basic".into(),
                status: SubscriptionStatus::Active,
                current_period_start: 0,
                current_period_end: 1,
                cancel_at_period_end: false,
                created_at: 0,
                updated_at: 0,
            })
            .await;

        let token =
            create_token("root", "root@example.com", JWT_SECRET, chrono::Duration::hours(1))
                .unwrap();
        let request = http::Request::get("/api/admin/subscriptions")
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "active");
        assert_eq!(rows[0]["effective_status"], "expired");
    }
}
