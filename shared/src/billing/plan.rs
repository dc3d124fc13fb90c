//! Plan catalog model

use serde::{Deserialize, Serialize};

use super::Feature;

/// Billing interval of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Month,
    Year,
}

impl PlanInterval {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Number of calendar months covered by one billing period
    pub fn months(&self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Year => 12,
        }
    }
}

/// A priced feature bundle a company subscribes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Price per interval; zero for trial plans
    pub price: f64,
    /// ISO 4217 currency code
    pub currency: String,
    #[cfg_attr(feature = "db", sqlx(rename = "billing_interval"))]
    pub interval: PlanInterval,
    /// Capability flags (see [`Feature::key`])
    pub features: Vec<String>,
    pub active: bool,
    pub sort_order: i32,
}

impl Plan {
    /// Whether the plan grants a feature flag
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.iter().any(|f| f == feature.key())
    }

    /// Zero-priced plans are handed out as trials
    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }

    /// Whether the plan can be sold through checkout
    pub fn is_purchasable(&self) -> bool {
        self.active && self.price.is_finite() && self.price > 0.0 && !self.currency.is_empty()
    }
}
