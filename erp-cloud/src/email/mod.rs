//! Transactional email
//!
//! Templates render to a plain-text subject and body; [`SesMailer`] delivers
//! them through AWS SES v2.

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use serde::{Deserialize, Serialize};
use shared::error::ErrorCode;

use crate::error::{BoxError, ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    TrialStarted,
    TrialEnding,
    PaymentApproved,
    SubscriptionCancelled,
}

impl EmailTemplate {
    pub fn key(&self) -> &'static str {
        match self {
            Self::TrialStarted => "trial_started",
            Self::TrialEnding => "trial_ending",
            Self::PaymentApproved => "payment_approved",
            Self::SubscriptionCancelled => "subscription_cancelled",
        }
    }
}

/// Values interpolated into a template
#[derive(Debug, Clone)]
pub struct EmailContext {
    pub company_name: String,
    pub plan_name: String,
    /// Unix millis
    pub period_end: i64,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
}

fn format_date(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn render(template: EmailTemplate, ctx: &EmailContext) -> RenderedEmail {
    let company = &ctx.company_name;
    let plan = &ctx.plan_name;
    let end = format_date(ctx.period_end);
    let days = ctx.days_remaining;

    match template {
        EmailTemplate::TrialStarted => RenderedEmail {
            subject: "Tu prueba gratuita comenzó / Your free trial has started".into(),
            text: format!(
                "{company} ya tiene acceso al plan \"{plan}\" hasta el {end}.\n\n\
                 {company} now has access to the \"{plan}\" plan until {end}."
            ),
        },
        EmailTemplate::TrialEnding => RenderedEmail {
            subject: "Tu suscripción está por vencer / Your subscription ends soon".into(),
            text: format!(
                "El plan \"{plan}\" de {company} vence en {days} día(s), el {end}.\n\
                 Renová desde la sección de facturación para no perder acceso.\n\n\
                 The \"{plan}\" plan for {company} ends in {days} day(s), on {end}.\n\
                 Renew from the billing page to keep access."
            ),
        },
        EmailTemplate::PaymentApproved => RenderedEmail {
            subject: "Pago aprobado / Payment approved".into(),
            text: format!(
                "Recibimos el pago del plan \"{plan}\" para {company}. \
                 El período actual termina el {end}.\n\n\
                 We received the payment for the \"{plan}\" plan for {company}. \
                 The current period ends on {end}."
            ),
        },
        EmailTemplate::SubscriptionCancelled => RenderedEmail {
            subject: "Suscripción cancelada / Subscription cancelled".into(),
            text: format!(
                "La suscripción de {company} al plan \"{plan}\" fue cancelada.\n\n\
                 The \"{plan}\" subscription for {company} has been cancelled."
            ),
        },
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, email: &RenderedEmail) -> ServiceResult<()>;
}

pub struct SesMailer {
    ses: SesClient,
    from: String,
}

impl SesMailer {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }

    async fn deliver(&self, to: &str, email: &RenderedEmail) -> Result<(), BoxError> {
        let subject = Content::builder().data(&email.subject).build()?;
        let body = Body::builder()
            .text(Content::builder().data(&email.text).build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, to: &str, email: &RenderedEmail) -> ServiceResult<()> {
        self.deliver(to, email)
            .await
            .map_err(|e| ServiceError::upstream(ErrorCode::EmailSendFailed, e.to_string()))?;
        tracing::info!(to = to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Logs instead of sending; used when SES is not configured in development
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, email: &RenderedEmail) -> ServiceResult<()> {
        tracing::info!(to = to, subject = %email.subject, "Email (not sent, log mailer)");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, RenderedEmail)>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<(String, RenderedEmail)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, email: &RenderedEmail) -> ServiceResult<()> {
            if self.fail {
                return Err(ServiceError::upstream(
                    ErrorCode::EmailSendFailed,
                    "mailbox unavailable",
                ));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), email.clone()));
            Ok(())
        }
    }
}
