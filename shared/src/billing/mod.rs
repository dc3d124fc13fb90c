//! Subscription billing domain types shared between the service and clients

pub mod company;
pub mod feature;
pub mod payment;
pub mod plan;
pub mod subscription;

pub use company::{Company, CompanyRole, Membership, UserProfile};
pub use feature::Feature;
pub use payment::{ExternalReference, InvalidExternalReference, Payment, PaymentStatus};
pub use plan::{Plan, PlanInterval};
pub use subscription::{Subscription, SubscriptionStatus};

/// Length of an automatically granted trial
pub const TRIAL_PERIOD_DAYS: i64 = 14;
