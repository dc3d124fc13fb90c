//! Transactional email endpoint

use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, ErrorCode};

use super::ApiResult;
use crate::auth::Principal;
use crate::auth::rate_limit::email_rate_limit;
use crate::billing::notify::email_context;
use crate::billing::require_member;
use crate::email::{EmailTemplate, render};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/api/email/send",
        post(send_email).layer(middleware::from_fn_with_state(
            state.clone(),
            email_rate_limit,
        )),
    )
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub template: EmailTemplate,
    pub company_id: String,
    /// Recipient override, super admins only
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub to: String,
    pub template: EmailTemplate,
}

/// POST /api/email/send
pub async fn send_email(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SendEmailRequest>,
) -> ApiResult<SendEmailResponse> {
    let store = state.store.as_ref();
    if !principal.is_super_admin {
        require_member(store, &principal, &req.company_id).await?;
    }

    let to = match req.to {
        Some(to) if principal.is_super_admin => to,
        Some(_) => {
            return Err(AppError::with_message(
                ErrorCode::SuperAdminRequired,
                "Only super admins may choose the recipient",
            ));
        }
        None => principal.email.clone(),
    };

    let sub = store
        .find_open_subscription(&req.company_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::NoSubscription))?;
    let now = shared::util::now_millis();
    let (ctx, _owner) = email_context(store, &sub, now).await?;

    state
        .mailer
        .send(&to, &render(req.template, &ctx))
        .await?;
    tracing::info!(
        company_id = %req.company_id,
        template = req.template.key(),
        user_id = %principal.user_id,
        "Transactional email sent"
    );

    Ok(ApiResponse::success(SendEmailResponse {
        to,
        template: req.template,
    }))
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{Harness, JWT_SECRET};
    use crate::auth::session_auth::create_token;

    #[tokio::test]
    async fn member_receives_rendered_template() {
        let h = Harness::new().await;
        h.get("/api/billing/subscription?company_id=c1", Some("owner"))
            .await;

        let (status, body) = h
            .post(
                "/api/email/send",
                Some("tech"),
                json!({ "template": "trial_ending", "company_id": "c1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["to"], "tech@example.com");
        let sent = h.mailer.sent();
        assert_eq!(sent.last().unwrap().0, "tech@example.com");
    }

    #[tokio::test]
    async fn recipient_override_requires_super_admin() {
        let h = Harness::new().await;
        h.get("/api/billing/subscription?company_id=c1", Some("owner"))
            .await;
        let req = json!({
            "template": "payment_approved",
            "company_id": "c1",
            "to": "someone@example.com",
        });

        let (status, body) = h.post("/api/email/send", Some("admin"), req.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 2003);

        let token = create_token(
            "root",
            "Root@Example.com",
            JWT_SECRET,
            chrono::Duration::hours(1),
        )
        .unwrap();
        let request = http::Request::post("/api/email/send")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::from(req.to_string()))
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["to"], "someone@example.com");
    }

    #[tokio::test]
    async fn no_subscription_is_payment_required() {
        let h = Harness::new().await;
        let (status, body) = h
            .post(
                "/api/email/send",
                Some("admin"),
                json!({ "template": "trial_started", "company_id": "c1" }),
            )
            .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["code"], 3011);
    }
}
