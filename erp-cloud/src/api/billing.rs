//! Billing endpoints: plans, subscription, checkout, cancel, feature checks

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use shared::billing::{Feature, Plan, Subscription, SubscriptionStatus};
use shared::error::{ApiResponse, AppError, ErrorCode};

use super::ApiResult;
use crate::auth::Principal;
use crate::auth::rate_limit::checkout_rate_limit;
use crate::billing::cancel::cancel_subscription;
use crate::billing::checkout::{CheckoutSession, CheckoutSettings, create_checkout};
use crate::billing::gate::{Access, check_feature};
use crate::billing::notify::notify_owner_logged;
use crate::billing::trial::{TrialOutcome, ensure_trial};
use crate::billing::require_member;
use crate::email::EmailTemplate;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/billing/plans", get(list_plans))
        .route("/api/billing/subscription", get(get_subscription))
        .route(
            "/api/billing/checkout",
            post(checkout).layer(middleware::from_fn_with_state(
                state.clone(),
                checkout_rate_limit,
            )),
        )
        .route("/api/billing/cancel", post(cancel))
        .route("/api/billing/features/{feature}", get(feature_access))
}

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub company_id: String,
}

/// GET /api/billing/plans
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Vec<Plan>> {
    let plans = state.store.list_plans().await?;
    Ok(ApiResponse::success(
        plans.into_iter().filter(|p| p.active).collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub subscription: Option<Subscription>,
    pub effective_status: Option<SubscriptionStatus>,
    pub plan: Option<Plan>,
    pub trial_created: bool,
}

/// GET /api/billing/subscription?company_id=
///
/// Provisions a trial when the company has no open subscription.
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<SubscriptionView> {
    let now = shared::util::now_millis();
    let store = state.store.as_ref();
    let outcome = ensure_trial(store, &principal, &query.company_id, now).await?;

    if let TrialOutcome::Created(sub) = &outcome {
        notify_owner_logged(
            store,
            state.mailer.as_ref(),
            sub,
            EmailTemplate::TrialStarted,
            now,
        )
        .await;
    }

    let plan = match outcome.subscription() {
        Some(sub) => store.find_plan(&sub.plan_id).await?,
        None => None,
    };
    Ok(ApiResponse::success(SubscriptionView {
        effective_status: outcome.subscription().map(|s| s.effective_status(now)),
        trial_created: matches!(outcome, TrialOutcome::Created(_)),
        subscription: outcome.subscription().cloned(),
        plan,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub company_id: String,
    pub plan_id: String,
}

/// POST /api/billing/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<CheckoutSession> {
    let settings = CheckoutSettings::from_config(&state.config);
    let session = create_checkout(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &principal,
        &req.company_id,
        &req.plan_id,
        &settings,
        shared::util::now_millis(),
    )
    .await?;
    Ok(ApiResponse::success(session))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub company_id: String,
    pub subscription_id: String,
}

/// POST /api/billing/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Subscription> {
    let now = shared::util::now_millis();
    let store = state.store.as_ref();
    let result = cancel_subscription(
        store,
        &principal,
        &req.company_id,
        &req.subscription_id,
        now,
    )
    .await?;

    if result.changed {
        notify_owner_logged(
            store,
            state.mailer.as_ref(),
            &result.subscription,
            EmailTemplate::SubscriptionCancelled,
            now,
        )
        .await;
        return Ok(ApiResponse::success_with_message(
            "Subscription cancelled",
            result.subscription,
        ));
    }
    Ok(ApiResponse::success_with_message(
        "Subscription already cancelled",
        result.subscription,
    ))
}

/// GET /api/billing/features/{feature}?company_id=
pub async fn feature_access(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(feature): Path<String>,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<Access> {
    let feature = Feature::from_key(&feature).ok_or_else(|| {
        AppError::new(ErrorCode::UnknownFeature).with_detail("feature", feature.clone())
    })?;
    let store = state.store.as_ref();
    require_member(store, &principal, &query.company_id).await?;
    let access = check_feature(store, &query.company_id, feature, shared::util::now_millis()).await?;
    Ok(ApiResponse::success(access))
}
