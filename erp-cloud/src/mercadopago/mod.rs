//! MercadoPago integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared::error::ErrorCode;

use crate::error::{ServiceError, ServiceResult};

const API_BASE: &str = "https://api.mercadopago.com";

/// One line of a checkout preference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub currency_id: String,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payer {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceMetadata {
    pub company_id: String,
    pub plan_id: String,
    pub user_id: String,
}

/// Body of `POST /checkout/preferences`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: Payer,
    pub back_urls: BackUrls,
    pub auto_return: String,
    pub notification_url: String,
    pub external_reference: String,
    pub metadata: PreferenceMetadata,
}

/// Created checkout preference
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

/// Subset of `GET /v1/payments/{id}` used to settle a payment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentInfo {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payment_type_id: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Payment ids come back as JSON numbers
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected payment id: {other}"
        ))),
    }
}

/// Payment processor seam; handlers only see this trait
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, request: &PreferenceRequest) -> ServiceResult<Preference>;

    async fn get_payment(&self, payment_id: &str) -> ServiceResult<PaymentInfo>;
}

pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl MercadoPagoClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Pull the processor's error message out of a failed response
    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        match resp.json::<serde_json::Value>().await {
            Ok(body) => body["message"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| format!("MercadoPago returned {status}: {body}")),
            Err(_) => format!("MercadoPago returned {status}"),
        }
    }
}

fn transport_error(code: ErrorCode, e: reqwest::Error) -> ServiceError {
    ServiceError::upstream(code, format!("MercadoPago request failed: {e}"))
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(&self, request: &PreferenceRequest) -> ServiceResult<Preference> {
        let resp = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(ErrorCode::PaymentSetupFailed, e))?;

        if !resp.status().is_success() {
            let message = Self::error_message(resp).await;
            return Err(ServiceError::upstream(ErrorCode::PaymentSetupFailed, message));
        }

        resp.json::<Preference>()
            .await
            .map_err(|e| transport_error(ErrorCode::PaymentSetupFailed, e))
    }

    async fn get_payment(&self, payment_id: &str) -> ServiceResult<PaymentInfo> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| transport_error(ErrorCode::UpstreamError, e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(shared::error::AppError::new(ErrorCode::PaymentNotFound).into());
        }
        if !resp.status().is_success() {
            let message = Self::error_message(resp).await;
            return Err(ServiceError::upstream(ErrorCode::UpstreamError, message));
        }

        resp.json::<PaymentInfo>()
            .await
            .map_err(|e| transport_error(ErrorCode::UpstreamError, e))
    }
}

/// Verify a MercadoPago webhook signature (HMAC-SHA256)
///
/// `x-signature` carries `ts=<ts>,v1=<hex>`; the signed manifest is
/// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.
pub fn verify_webhook_signature(
    sig_header: &str,
    request_id: &str,
    data_id: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("ts=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid x-signature header");
    }

    // Alphanumeric ids are signed lowercased
    let manifest = format!(
        "id:{};request-id:{request_id};ts:{timestamp};",
        data_id.to_ascii_lowercase()
    );
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(manifest.as_bytes());

    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    Ok(())
}
