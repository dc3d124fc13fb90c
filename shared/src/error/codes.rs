//! Unified error codes for erp-cloud
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Company errors
//! - 4xxx: Subscription and plan errors
//! - 5xxx: Payment errors
//! - 6xxx: Email errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests from this client
    TooManyRequests = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Owner or admin role required
    RoleRequired = 2002,
    /// Super admin required
    SuperAdminRequired = 2003,

    // ==================== 3xxx: Company ====================
    /// Company not found
    CompanyNotFound = 3002,
    /// Caller is not a member of the company
    NotCompanyMember = 3003,
    /// Feature not available in current subscription plan
    FeatureNotAvailable = 3010,
    /// No active subscription for company
    NoSubscription = 3011,

    // ==================== 4xxx: Subscription ====================
    /// Plan not found
    PlanNotFound = 4001,
    /// Plan is not active
    PlanInactive = 4002,
    /// Plan price is not a positive amount
    PlanInvalidPrice = 4003,
    /// Subscription not found
    SubscriptionNotFound = 4004,
    /// Unknown feature key
    UnknownFeature = 4005,
    /// Subscription status does not allow cancellation
    SubscriptionNotCancellable = 4006,

    // ==================== 5xxx: Payment ====================
    /// Payment processor rejected the checkout request
    PaymentSetupFailed = 5001,
    /// Payment not found
    PaymentNotFound = 5002,
    /// Webhook signature invalid
    WebhookSignatureInvalid = 5003,
    /// Payment processor credentials missing
    PaymentProviderNotConfigured = 5004,
    /// Currency missing
    CurrencyRequired = 5005,

    // ==================== 6xxx: Email ====================
    /// Email delivery failed
    EmailSendFailed = 6001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Upstream service returned an error
    UpstreamError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Owner or admin role is required",
            ErrorCode::SuperAdminRequired => "Super admin access is required",

            // Company
            ErrorCode::CompanyNotFound => "Company not found",
            ErrorCode::NotCompanyMember => "You are not a member of this company",
            ErrorCode::FeatureNotAvailable => "Feature not available in current subscription plan",
            ErrorCode::NoSubscription => "No active subscription",

            // Subscription
            ErrorCode::PlanNotFound => "Plan not found",
            ErrorCode::PlanInactive => "Plan is not available",
            ErrorCode::PlanInvalidPrice => "Plan price must be a positive amount",
            ErrorCode::SubscriptionNotFound => "Subscription not found",
            ErrorCode::UnknownFeature => "Unknown feature",
            ErrorCode::SubscriptionNotCancellable => "Subscription cannot be cancelled",

            // Payment
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::WebhookSignatureInvalid => "Invalid webhook signature",
            ErrorCode::PaymentProviderNotConfigured => "Payment processor is not configured",
            ErrorCode::CurrencyRequired => "Currency is required",

            // Email
            ErrorCode::EmailSendFailed => "Email delivery failed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream service error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::TooManyRequests),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::SuperAdminRequired),

            // Company
            3002 => Ok(ErrorCode::CompanyNotFound),
            3003 => Ok(ErrorCode::NotCompanyMember),
            3010 => Ok(ErrorCode::FeatureNotAvailable),
            3011 => Ok(ErrorCode::NoSubscription),

            // Subscription
            4001 => Ok(ErrorCode::PlanNotFound),
            4002 => Ok(ErrorCode::PlanInactive),
            4003 => Ok(ErrorCode::PlanInvalidPrice),
            4004 => Ok(ErrorCode::SubscriptionNotFound),
            4005 => Ok(ErrorCode::UnknownFeature),
            4006 => Ok(ErrorCode::SubscriptionNotCancellable),

            // Payment
            5001 => Ok(ErrorCode::PaymentSetupFailed),
            5002 => Ok(ErrorCode::PaymentNotFound),
            5003 => Ok(ErrorCode::WebhookSignatureInvalid),
            5004 => Ok(ErrorCode::PaymentProviderNotConfigured),
            5005 => Ok(ErrorCode::CurrencyRequired),

            // Email
            6001 => Ok(ErrorCode::EmailSendFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::RoleRequired.code(), 2002);
        assert_eq!(ErrorCode::CompanyNotFound.code(), 3002);
        assert_eq!(ErrorCode::SubscriptionNotFound.code(), 4004);
        assert_eq!(ErrorCode::PaymentSetupFailed.code(), 5001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_matches_code() {
        for code in [
            ErrorCode::Success,
            ErrorCode::NotFound,
            ErrorCode::TokenExpired,
            ErrorCode::SuperAdminRequired,
            ErrorCode::NoSubscription,
            ErrorCode::UnknownFeature,
            ErrorCode::SubscriptionNotCancellable,
            ErrorCode::CurrencyRequired,
            ErrorCode::EmailSendFailed,
            ErrorCode::UpstreamError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_unknown_value() {
        assert_eq!(ErrorCode::try_from(6), Err(InvalidErrorCode(6)));
        assert_eq!(ErrorCode::try_from(65535), Err(InvalidErrorCode(65535)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::PlanNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("2001").unwrap();
        assert_eq!(code, ErrorCode::PermissionDenied);
        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_messages_are_not_empty() {
        assert_eq!(ErrorCode::NotFound.message(), "Resource not found");
        assert_eq!(
            ErrorCode::RoleRequired.message(),
            "Owner or admin role is required"
        );
        assert!(!ErrorCode::UpstreamError.message().is_empty());
    }
}
