//! Bearer-secret guard for scheduled jobs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// Constant-time comparison of two secrets
///
/// Both sides are run through HMAC so the comparison length does not depend
/// on the caller's input.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(b"cron-secret-compare") else {
        return false;
    };
    mac.update(expected.as_bytes());
    let expected_tag = mac.finalize().into_bytes();

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(b"cron-secret-compare") else {
        return false;
    };
    mac.update(provided.as_bytes());
    mac.verify_slice(&expected_tag).is_ok()
}

/// Require `Authorization: Bearer {CRON_SECRET}`
pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(secret) = state.config.cron_secret.as_deref() else {
        tracing::error!("CRON_SECRET not configured");
        return Err(AppError::config("Cron secret is not configured").into_response());
    };

    let provided = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if secrets_match(token, secret) => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Rejected cron request with missing or invalid secret");
            Err(AppError::new(ErrorCode::NotAuthenticated).into_response())
        }
    }
}
