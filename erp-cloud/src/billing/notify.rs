//! Owner notifications for subscription events

use shared::billing::Subscription;
use shared::error::{AppError, ErrorCode};

use crate::db::BillingStore;
use crate::email::{EmailContext, EmailTemplate, Mailer, render};
use crate::error::ServiceResult;

/// Template values for a subscription, plus the company owner's address
pub async fn email_context(
    store: &dyn BillingStore,
    sub: &Subscription,
    now: i64,
) -> ServiceResult<(EmailContext, String)> {
    let company = store
        .find_company(&sub.company_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CompanyNotFound))?;
    let owner = store.find_user(&company.owner_id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::NotFound, "Company owner profile not found")
    })?;
    let plan_name = store
        .find_plan(&sub.plan_id)
        .await?
        .map(|p| p.name)
        .unwrap_or_else(|| sub.plan_id.clone());

    let ctx = EmailContext {
        company_name: company.name,
        plan_name,
        period_end: sub.current_period_end,
        days_remaining: sub.days_remaining(now),
    };
    Ok((ctx, owner.email))
}

/// Email the company owner about `sub`
pub async fn notify_owner(
    store: &dyn BillingStore,
    mailer: &dyn Mailer,
    sub: &Subscription,
    template: EmailTemplate,
    now: i64,
) -> ServiceResult<()> {
    let (ctx, to) = email_context(store, sub, now).await?;
    mailer.send(&to, &render(template, &ctx)).await
}

/// [`notify_owner`], logging failures instead of returning them
pub async fn notify_owner_logged(
    store: &dyn BillingStore,
    mailer: &dyn Mailer,
    sub: &Subscription,
    template: EmailTemplate,
    now: i64,
) {
    if let Err(e) = notify_owner(store, mailer, sub, template, now).await {
        tracing::warn!(
            company_id = %sub.company_id,
            subscription_id = %sub.id,
            template = template.key(),
            error = %e,
            "Failed to send notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::fixtures::{self, NOW, principal};
    use crate::billing::trial::ensure_trial;
    use crate::email::testing::RecordingMailer;

    #[tokio::test]
    async fn sends_to_company_owner() {
        let store = fixtures::store().await;
        let outcome = ensure_trial(&store, &principal("admin"), "c1", NOW)
            .await
            .unwrap();
        let mailer = RecordingMailer::default();

        notify_owner(
            &store,
            &mailer,
            outcome.subscription().unwrap(),
            EmailTemplate::TrialStarted,
            NOW,
        )
        .await
        .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "owner@example.com");
        assert!(sent[0].1.text.contains("\"Trial\""));
        assert!(sent[0].1.text.contains("Taller Norte"));
    }

    #[tokio::test]
    async fn logged_variant_swallows_failures() {
        let store = fixtures::store().await;
        let outcome = ensure_trial(&store, &principal("admin"), "c1", NOW)
            .await
            .unwrap();
        let mailer = RecordingMailer::failing();
        notify_owner_logged(
            &store,
            &mailer,
            outcome.subscription().unwrap(),
            EmailTemplate::TrialStarted,
            NOW,
        )
        .await;
        assert!(mailer.sent().is_empty());
    }
}
