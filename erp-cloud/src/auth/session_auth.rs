//! Session JWT authentication
//!
//! Tokens are issued by the auth provider and signed with the shared HS256
//! secret; this service only verifies them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// JWT claims of a provider session token
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    #[serde(default)]
    pub iat: usize,
}

/// Authenticated caller extracted from the session token
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub is_super_admin: bool,
}

/// Verify a session token and return its claims
pub fn decode_token(token: &str, secret: &str) -> Result<SessionClaims, AppError> {
    let mut validation = Validation::default();
    // Provider tokens carry an audience this service does not pin
    validation.validate_aud = false;

    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired)
        }
        _ => {
            tracing::debug!("JWT validation failed: {e}");
            AppError::new(ErrorCode::TokenInvalid)
        }
    })
}

/// Middleware that extracts and verifies the session JWT from the Authorization header
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "Missing Authorization header")
                .into_response()
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::with_message(ErrorCode::TokenInvalid, "Invalid Authorization format")
            .into_response()
    })?;

    let claims = decode_token(token, &state.config.jwt_secret).map_err(|e| {
        tracing::warn!(code = %e.code, "Rejected session token");
        e.into_response()
    })?;

    let principal = Principal {
        is_super_admin: state.is_super_admin(&claims.email),
        user_id: claims.sub,
        email: claims.email,
    };

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Issue a token the way the auth provider does
#[cfg(test)]
pub fn create_token(
    user_id: &str,
    email: &str,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}
