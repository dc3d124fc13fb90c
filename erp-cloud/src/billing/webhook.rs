//! Payment notification processing

use serde::Deserialize;
use shared::billing::{ExternalReference, PaymentStatus, Subscription};
use shared::error::{AppError, ErrorCode};
use shared::util::add_months_millis;

use crate::db::{BillingStore, PaymentUpdate, PlanActivation};
use crate::error::ServiceResult;
use crate::mercadopago::{PaymentGateway, PaymentInfo};

/// Notification body posted by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    #[serde(rename = "type", alias = "topic", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected notification id: {other}"
        ))),
    }
}

impl Notification {
    /// Processor payment id when this is a payment notification
    pub fn payment_id(&self) -> Option<&str> {
        match (self.kind.as_deref(), &self.data) {
            (Some("payment"), Some(data)) if !data.id.is_empty() => Some(&data.id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Not a payment, or no matching local payment
    Ignored,
    /// Same payment and status already processed
    Duplicate,
    /// Payment row updated; no plan change
    Recorded(PaymentStatus),
    /// Approved payment switched the company to the paid plan
    Activated(Subscription),
}

/// Settle a processor payment against the local payment row and, when
/// approved, activate the paid plan.
///
/// A failed attempt releases its event record so the processor's redelivery
/// is handled from scratch.
pub async fn process_payment(
    store: &dyn BillingStore,
    gateway: &dyn PaymentGateway,
    payment_id: &str,
    now: i64,
) -> ServiceResult<WebhookOutcome> {
    let info = gateway.get_payment(payment_id).await?;

    // Each (payment, status) pair is handled once; the processor re-sends
    // notifications and a payment may legitimately move pending -> approved.
    let event_id = format!("payment:{}:{}", info.id, info.status);
    if !store.record_webhook_event(&event_id, "payment", now).await? {
        tracing::info!(payment_id, "Duplicate payment notification");
        return Ok(WebhookOutcome::Duplicate);
    }

    match settle(store, &info, now).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            if let Err(release) = store.forget_webhook_event(&event_id).await {
                tracing::error!(payment_id, error = %release, "Failed to release webhook event");
            }
            Err(e)
        }
    }
}

async fn settle(
    store: &dyn BillingStore,
    info: &PaymentInfo,
    now: i64,
) -> ServiceResult<WebhookOutcome> {
    let payment_id = info.id.as_str();
    let status = PaymentStatus::from_processor(&info.status);

    let Some(raw_reference) = info.external_reference.as_deref() else {
        tracing::warn!(payment_id, "Payment has no external reference");
        return Ok(WebhookOutcome::Ignored);
    };
    let reference: ExternalReference = match raw_reference.parse() {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(payment_id, error = %e, "Ignoring payment");
            return Ok(WebhookOutcome::Ignored);
        }
    };
    let Some(payment) = store.find_payment_by_reference(raw_reference).await? else {
        tracing::warn!(
            payment_id,
            company_id = %reference.company_id,
            "No local payment for reference"
        );
        return Ok(WebhookOutcome::Ignored);
    };

    store
        .update_payment(&PaymentUpdate {
            payment_id: &payment.id,
            status,
            payment_type: info.payment_type_id.as_deref(),
            external_payment_id: &info.id,
            now,
        })
        .await?;
    tracing::info!(
        company_id = %reference.company_id,
        plan_id = %reference.plan_id,
        payment_id,
        status = status.as_db(),
        "Payment updated"
    );

    if status != PaymentStatus::Approved {
        return Ok(WebhookOutcome::Recorded(status));
    }

    let plan = store.find_plan(&reference.plan_id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::PlanNotFound).with_detail("plan_id", reference.plan_id.clone())
    })?;
    let sub = store
        .activate_plan(&PlanActivation {
            company_id: &reference.company_id,
            plan_id: &plan.id,
            period_start: now,
            period_end: add_months_millis(now, plan.interval.months()),
            now,
        })
        .await?;

    tracing::info!(
        company_id = %sub.company_id,
        subscription_id = %sub.id,
        plan_id = %sub.plan_id,
        "Paid plan activated"
    );
    let detail = serde_json::json!({
        "subscription_id": sub.id,
        "plan_id": sub.plan_id,
        "payment_id": info.id,
    });
    store
        .audit(&sub.company_id, "payment_approved", Some(&detail), now)
        .await?;

    Ok(WebhookOutcome::Activated(sub))
}
