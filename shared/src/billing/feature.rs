//! Gated capabilities

use serde::{Deserialize, Serialize};

/// A capability a plan may grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Inventory,
    Sales,
    Repairs,
    Billing,
    SupportTickets,
    Reports,
    MultiBranch,
    ApiAccess,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Inventory,
        Feature::Sales,
        Feature::Repairs,
        Feature::Billing,
        Feature::SupportTickets,
        Feature::Reports,
        Feature::MultiBranch,
        Feature::ApiAccess,
    ];

    /// Flag key stored in `plans.features`
    pub fn key(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Sales => "sales",
            Self::Repairs => "repairs",
            Self::Billing => "billing",
            Self::SupportTickets => "support_tickets",
            Self::Reports => "reports",
            Self::MultiBranch => "multi_branch",
            Self::ApiAccess => "api_access",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Display name used in upsell messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inventory => "Inventory",
            Self::Sales => "Sales",
            Self::Repairs => "Repairs",
            Self::Billing => "Invoicing",
            Self::SupportTickets => "Support tickets",
            Self::Reports => "Reports",
            Self::MultiBranch => "Multiple branches",
            Self::ApiAccess => "API access",
        }
    }

    /// Id of the cheapest catalog plan that includes this feature
    pub fn minimum_plan(&self) -> &'static str {
        match self {
            Self::Inventory | Self::Sales | Self::Repairs => "basic",
            Self::Billing | Self::SupportTickets | Self::Reports => "pro",
            Self::MultiBranch | Self::ApiAccess => "enterprise",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
        }
        assert_eq!(Feature::from_key("teleportation"), None);
    }

    #[test]
    fn serde_uses_flag_keys() {
        let json = serde_json::to_string(&Feature::SupportTickets).unwrap();
        assert_eq!(json, format!("\"{}\"", Feature::SupportTickets.key()));
    }
}
