//! HTTP routes for erp-cloud

pub mod admin;
pub mod billing;
pub mod cron;
pub mod email;
pub mod health;
pub mod session;
pub mod webhook;

use axum::Router;
use axum::middleware;
use http::{HeaderName, HeaderValue};
use shared::error::{ApiResponse, AppError};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;

use crate::auth::cron_auth::cron_auth_middleware;
use crate::auth::session_auth::session_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Generates an id for requests that arrive without `x-request-id`
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the application router with all middleware and state
pub fn create_router(state: AppState) -> Router {
    // Session-authenticated API
    let authenticated = Router::new()
        .merge(session::router())
        .merge(billing::router(&state))
        .merge(email::router(&state))
        .merge(admin::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ));

    // Scheduled jobs (bearer secret)
    let cron = cron::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        cron_auth_middleware,
    ));

    let request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(health::router())
        .merge(webhook::router())
        .merge(authenticated)
        .merge(cron)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use http::StatusCode;

    #[tokio::test]
    async fn health_is_public() {
        let h = Harness::new().await;
        let (status, body) = h.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn authenticated_routes_require_token() {
        let h = Harness::new().await;
        let (status, body) = h.get("/api/session", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 1001);

        let (status, _) = h.get("/api/billing/plans", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn response_carries_request_id() {
        let h = Harness::new().await;
        let resp = tower::ServiceExt::oneshot(
            h.router.clone(),
            http::Request::get("/health")
                .header("x-request-id", "req-42")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(resp.headers()["x-request-id"], "req-42");
    }
}
