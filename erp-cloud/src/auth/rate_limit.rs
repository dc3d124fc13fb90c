//! Request budgets for the checkout and email routes
//!
//! Budgets are counted per authenticated user when a [`Principal`] is
//! attached, otherwise per client IP.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::Principal;
use crate::state::AppState;

/// Route family sharing one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitScope {
    Checkout,
    Email,
}

#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub scope: LimitScope,
    pub max_requests: u32,
    pub window: Duration,
}

/// Checkout preferences: 10 per minute
pub const CHECKOUT_BUDGET: Budget = Budget {
    scope: LimitScope::Checkout,
    max_requests: 10,
    window: Duration::from_secs(60),
};

/// Manual email sends: 5 per minute
pub const EMAIL_BUDGET: Budget = Budget {
    scope: LimitScope::Email,
    max_requests: 5,
    window: Duration::from_secs(60),
};

struct Window {
    used: u32,
    started: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(LimitScope, String), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `budget` for `client`. Over budget, returns
    /// the time left until the window resets; rejected requests are not counted.
    async fn consume(&self, budget: &Budget, client: &str) -> Result<(), Duration> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = windows
            .entry((budget.scope, client.to_owned()))
            .or_insert(Window {
                used: 0,
                started: now,
            });

        if now.duration_since(window.started) >= budget.window {
            window.used = 0;
            window.started = now;
        }
        if window.used >= budget.max_requests {
            return Err(budget.window.saturating_sub(now.duration_since(window.started)));
        }
        window.used += 1;
        Ok(())
    }

    /// Drop windows that started more than `idle` ago
    pub async fn cleanup(&self, idle: Duration) {
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .retain(|_, window| now.duration_since(window.started) < idle);
    }
}

/// `user:{id}` for authenticated requests, else `ip:{addr}` (X-Forwarded-For
/// first, then the peer address).
fn client_key(request: &Request) -> String {
    if let Some(principal) = request.extensions().get::<Principal>() {
        return format!("user:{}", principal.user_id);
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return format!("ip:{ip}");
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| format!("ip:{}", ci.0.ip()))
        .unwrap_or_else(|| "ip:unknown".to_owned())
}

async fn enforce(state: &AppState, budget: &Budget, request: Request, next: Next) -> Response {
    let client = client_key(&request);
    match state.rate_limiter.consume(budget, &client).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let secs = retry_after.as_secs().max(1);
            tracing::warn!(scope = ?budget.scope, client = %client, "Rate limit hit");
            let mut response = AppError::new(ErrorCode::TooManyRequests)
                .with_detail("retry_after_secs", secs)
                .into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
            response
        }
    }
}

pub async fn checkout_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &CHECKOUT_BUDGET, request, next).await
}

pub async fn email_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, &EMAIL_BUDGET, request, next).await
}
