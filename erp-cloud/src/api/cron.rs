//! Scheduled job endpoints

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use shared::error::ApiResponse;

use super::ApiResult;
use crate::billing::reminders::{SweepReport, send_renewal_reminders};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/cron/notifications", post(notification_sweep))
}

/// POST /api/cron/notifications
pub async fn notification_sweep(State(state): State<AppState>) -> ApiResult<SweepReport> {
    let report = send_renewal_reminders(
        state.store.as_ref(),
        state.mailer.as_ref(),
        shared::util::now_millis(),
    )
    .await?;
    Ok(ApiResponse::success(report))
}
