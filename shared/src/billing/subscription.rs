//! Subscription record and lifecycle status

use serde::{Deserialize, Serialize};

/// Subscription lifecycle status
///
/// Transitions:
/// - `pending -> active` when a payment is approved
/// - `active -> cancelled` on explicit user action
/// - `active -> expired` once the period has ended (detected lazily)
///
/// `cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Paid or trial subscription in good standing
    Active,
    /// Awaiting a payment confirmation
    Pending,
    /// Cancelled by the company (terminal)
    Cancelled,
    /// Billing period ended without renewal
    Expired,
}

impl SubscriptionStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Statuses that count against the one-open-subscription-per-company rule
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Cancelled)
                | (Self::Active, Self::Expired)
                | (Self::Active, Self::Active)
        )
    }
}

/// A company's record of its current plan and billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: String,
    pub company_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    /// Unix millis
    pub current_period_start: i64,
    /// Unix millis, exclusive
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscription {
    /// Status as observed at `now`: an active subscription whose period has
    /// ended reads as expired even though the stored row still says active.
    pub fn effective_status(&self, now: i64) -> SubscriptionStatus {
        if self.status == SubscriptionStatus::Active && self.current_period_end <= now {
            SubscriptionStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_usable(&self, now: i64) -> bool {
        self.effective_status(now) == SubscriptionStatus::Active
    }

    /// Days left in the current period, rounded up; zero once ended
    pub fn days_remaining(&self, now: i64) -> i64 {
        use crate::util::DAY_MS;
        let left = self.current_period_end - now;
        if left <= 0 { 0 } else { (left + DAY_MS - 1) / DAY_MS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(status: SubscriptionStatus, end: i64) -> Subscription {
        Subscription {
            id: "sub-1".into(),
            company_id: "c-1".into(),
            plan_id: "trial".into(),
            status,
            current_period_start: 0,
            current_period_end: end,
            cancel_at_period_end: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn db_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            assert_eq!(SubscriptionStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(SubscriptionStatus::from_db("canceled"), None);
    }

    #[test]
    fn cancelled_is_terminal() {
        for next in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Expired,
        ] {
            assert!(!SubscriptionStatus::Cancelled.can_transition_to(next));
        }
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Cancelled));
        assert!(!SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Cancelled));
    }

    #[test]
    fn expiry_is_detected_lazily() {
        let s = sub(SubscriptionStatus::Active, 1_000);
        assert_eq!(s.effective_status(999), SubscriptionStatus::Active);
        assert_eq!(s.effective_status(1_000), SubscriptionStatus::Expired);
        assert!(!s.is_usable(5_000));

        let cancelled = sub(SubscriptionStatus::Cancelled, 1_000);
        assert_eq!(cancelled.effective_status(0), SubscriptionStatus::Cancelled);
    }

    #[test]
    fn days_remaining_rounds_up() {
        let s = sub(SubscriptionStatus::Active, 86_400_000 * 2);
        assert_eq!(s.days_remaining(0), 2);
        assert_eq!(s.days_remaining(1), 2);
        assert_eq!(s.days_remaining(86_400_000 + 1), 1);
        assert_eq!(s.days_remaining(86_400_000 * 3), 0);
    }

    #[test]
    fn open_statuses() {
        assert!(SubscriptionStatus::Active.is_open());
        assert!(SubscriptionStatus::Pending.is_open());
        assert!(!SubscriptionStatus::Cancelled.is_open());
        assert!(!SubscriptionStatus::Expired.is_open());
    }
}
