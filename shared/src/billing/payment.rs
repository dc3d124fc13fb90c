//! Payment attempts and webhook correlation keys

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment status as tracked locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        }
    }

    /// Map a processor-side payment status onto the local status set
    pub fn from_processor(status: &str) -> Self {
        match status {
            "approved" => Self::Approved,
            "rejected" | "cancelled" => Self::Rejected,
            "refunded" | "charged_back" => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

/// One checkout attempt for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub company_id: String,
    pub plan_id: String,
    /// Checkout preference id returned by the processor
    pub preference_id: String,
    /// Processor payment id, known once the webhook fires
    pub external_payment_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_type: Option<String>,
    pub external_reference: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Composite key `{company_id}|{plan_id}|{created_at}` attached to a
/// checkout preference so webhook notifications can be correlated back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub company_id: String,
    pub plan_id: String,
    /// Unix millis at preference creation
    pub created_at: i64,
}

/// Error parsing an [`ExternalReference`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed external reference: {0}")]
pub struct InvalidExternalReference(pub String);

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.company_id, self.plan_id, self.created_at)
    }
}

impl FromStr for ExternalReference {
    type Err = InvalidExternalReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidExternalReference(s.to_string());
        let mut parts = s.split('|');
        let (Some(company_id), Some(plan_id), Some(ts), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if company_id.is_empty() || plan_id.is_empty() {
            return Err(invalid());
        }
        let created_at = ts.parse().map_err(|_| invalid())?;
        Ok(Self {
            company_id: company_id.to_string(),
            plan_id: plan_id.to_string(),
            created_at,
        })
    }
}
