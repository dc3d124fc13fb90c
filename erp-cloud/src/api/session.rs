//! Session / profile endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};
use futures::future::try_join_all;
use serde::Serialize;
use shared::billing::{Company, CompanyRole, Plan, Subscription, SubscriptionStatus};
use shared::error::ApiResponse;

use super::ApiResult;
use crate::auth::Principal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/session", get(get_session))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub id: String,
    pub plan_id: String,
    pub plan_name: Option<String>,
    pub status: SubscriptionStatus,
    pub effective_status: SubscriptionStatus,
    pub current_period_end: i64,
    pub days_remaining: i64,
}

impl SubscriptionSummary {
    pub fn new(sub: &Subscription, plans: &[Plan], now: i64) -> Self {
        Self {
            id: sub.id.clone(),
            plan_id: sub.plan_id.clone(),
            plan_name: plans
                .iter()
                .find(|p| p.id == sub.plan_id)
                .map(|p| p.name.clone()),
            status: sub.status,
            effective_status: sub.effective_status(now),
            current_period_end: sub.current_period_end,
            days_remaining: sub.days_remaining(now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompanySession {
    pub company: Company,
    pub role: CompanyRole,
    pub subscription: Option<SubscriptionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_super_admin: bool,
    pub companies: Vec<CompanySession>,
}

/// GET /api/session
pub async fn get_session(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<SessionInfo> {
    let now = shared::util::now_millis();
    let store = state.store.as_ref();

    let (profile, memberships, plans) = tokio::try_join!(
        store.find_user(&principal.user_id),
        store.memberships_for_user(&principal.user_id),
        store.list_plans(),
    )?;

    let subscriptions: Vec<Option<Subscription>> = try_join_all(
        memberships
            .iter()
            .map(|m| store.find_open_subscription(&m.company.id)),
    )
    .await?;

    let companies = memberships
        .into_iter()
        .zip(subscriptions)
        .map(|(m, sub)| CompanySession {
            subscription: sub.as_ref().map(|s| SubscriptionSummary::new(s, &plans, now)),
            company: m.company,
            role: m.role,
        })
        .collect();

    Ok(ApiResponse::success(SessionInfo {
        full_name: profile.and_then(|p| p.full_name),
        user_id: principal.user_id,
        email: principal.email,
        is_super_admin: principal.is_super_admin,
        companies,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use http::StatusCode;

    #[tokio::test]
    async fn lists_memberships_with_subscription() {
        let h = Harness::new().await;
        // Provision the trial through the API first
        let (status, _) = h
            .get("/api/billing/subscription?company_id=c1", Some("admin"))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h.get("/api/session", Some("admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        let data = &body["data"];
        assert_eq!(data["user_id"], "admin");
        assert_eq!(data["is_super_admin"], false);
        let companies = data["companies"].as_array().unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0]["company"]["name"], "Taller Norte");
        assert_eq!(companies[0]["role"], "admin");
        assert_eq!(companies[0]["subscription"]["plan_name"], "Trial");
        assert_eq!(companies[0]["subscription"]["effective_status"], "active");
        assert_eq!(companies[0]["subscription"]["days_remaining"], 14);
    }

    #[tokio::test]
    async fn user_without_companies_gets_empty_list() {
        let h = Harness::new().await;
        let (status, body) = h.get("/api/session", Some("outsider")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["companies"].as_array().unwrap().is_empty());
    }
}
