//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::CompanyNotFound
            | Self::PlanNotFound
            | Self::SubscriptionNotFound
            | Self::PaymentNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::SubscriptionNotCancellable => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::WebhookSignatureInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied
            | Self::RoleRequired
            | Self::SuperAdminRequired
            | Self::NotCompanyMember
            | Self::FeatureNotAvailable => StatusCode::FORBIDDEN,

            // 429 Too Many Requests
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            // 402 Payment Required
            Self::NoSubscription => StatusCode::PAYMENT_REQUIRED,

            // 502 Bad Gateway (upstream returned an error)
            Self::PaymentSetupFailed | Self::EmailSendFailed | Self::UpstreamError => {
                StatusCode::BAD_GATEWAY
            }

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::PaymentProviderNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
