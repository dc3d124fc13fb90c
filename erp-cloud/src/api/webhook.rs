//! MercadoPago webhook handler
//!
//! POST /api/webhooks/mercadopago (raw body, signature checked when a secret is configured)

use std::collections::HashMap;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;

use crate::billing::notify::notify_owner_logged;
use crate::billing::webhook::{Notification, WebhookOutcome, process_payment};
use crate::email::EmailTemplate;
use crate::mercadopago;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/mercadopago", post(handle_webhook))
}

/// Handle an incoming processor notification
///
/// Non-payment topics are acknowledged and ignored. Errors return 5xx so the
/// processor retries delivery.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let notification: Notification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    // The processor signs the id it puts in the query string
    let data_id = params
        .get("data.id")
        .map(String::as_str)
        .or_else(|| notification.data.as_ref().map(|d| d.id.as_str()))
        .unwrap_or_default();

    if let Some(secret) = state.config.mp_webhook_secret.as_deref() {
        let signature = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if let Err(e) =
            mercadopago::verify_webhook_signature(signature, request_id, data_id, secret)
        {
            tracing::warn!(error = e, "Webhook signature verification failed");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let Some(payment_id) = notification.payment_id() else {
        tracing::info!(kind = ?notification.kind, "Ignoring non-payment notification");
        return StatusCode::OK;
    };

    let now = shared::util::now_millis();
    match process_payment(state.store.as_ref(), state.gateway.as_ref(), payment_id, now).await {
        Ok(WebhookOutcome::Activated(sub)) => {
            notify_owner_logged(
                state.store.as_ref(),
                state.mailer.as_ref(),
                &sub,
                EmailTemplate::PaymentApproved,
                now,
            )
            .await;
            StatusCode::OK
        }
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(payment_id, error = %e, "Failed to process payment notification");
            shared::error::AppError::from(e).http_status()
        }
    }
}
