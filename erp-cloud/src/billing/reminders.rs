//! Renewal reminder sweep

use serde::Serialize;
use shared::util::DAY_MS;

use super::notify::notify_owner;
use crate::db::BillingStore;
use crate::email::{EmailTemplate, Mailer};
use crate::error::ServiceResult;

/// How far ahead of period end reminders go out
pub const REMINDER_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Email owners of active subscriptions ending within the reminder window.
/// Never writes to subscriptions.
pub async fn send_renewal_reminders(
    store: &dyn BillingStore,
    mailer: &dyn Mailer,
    now: i64,
) -> ServiceResult<SweepReport> {
    let ending = store
        .subscriptions_ending_between(now, now + REMINDER_WINDOW_DAYS * DAY_MS)
        .await?;

    let mut report = SweepReport {
        checked: ending.len(),
        ..Default::default()
    };
    for sub in &ending {
        match notify_owner(store, mailer, sub, EmailTemplate::TrialEnding, now).await {
            Ok(()) => report.notified += 1,
            Err(e) => {
                tracing::warn!(
                    company_id = %sub.company_id,
                    subscription_id = %sub.id,
                    error = %e,
                    "Renewal reminder failed"
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        checked = report.checked,
        notified = report.notified,
        failed = report.failed,
        "Renewal reminder sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::fixtures::{self, NOW, principal};
    use crate::billing::trial::ensure_trial;
    use crate::email::testing::RecordingMailer;

    #[tokio::test]
    async fn reminds_only_inside_window() {
        let store = fixtures::store().await;
        ensure_trial(&store, &principal("owner"), "c1", NOW)
            .await
            .unwrap();
        let mailer = RecordingMailer::default();

        // Trial ends at NOW + 14d; nothing is due yet
        let report = send_renewal_reminders(&store, &mailer, NOW).await.unwrap();
        assert_eq!(report, SweepReport::default());

        let two_days_before_end = NOW + 12 * DAY_MS;
        let report = send_renewal_reminders(&store, &mailer, two_days_before_end)
            .await
            .unwrap();
        assert_eq!(
            report,
            SweepReport {
                checked: 1,
                notified: 1,
                failed: 0
            }
        );
        let sent = mailer.sent();
        assert_eq!(sent[0].0, "owner@example.com");
        assert!(sent[0].1.text.contains("2 day(s)"));
    }

    #[tokio::test]
    async fn failures_are_counted_and_rows_untouched() {
        let store = fixtures::store().await;
        ensure_trial(&store, &principal("owner"), "c1", NOW)
            .await
            .unwrap();
        let before = store.subscriptions_for("c1").await;

        let report =
            send_renewal_reminders(&store, &RecordingMailer::failing(), NOW + 13 * DAY_MS)
                .await
                .unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(store.subscriptions_for("c1").await, before);
    }
}
