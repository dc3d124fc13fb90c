//! Unified service-layer error type for erp-cloud
//!
//! `ServiceError` bridges the gap between backend errors (`sqlx::Error`, `BoxError`,
//! processor failures) and the API-layer error (`AppError`). It enables `?`
//! propagation without manual `.map_err(|e| { tracing::error!(...); AppError::new(...) })`
//! boilerplate.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error.
///
/// - `Db`: Database/infrastructure errors (logged, mapped to DatabaseError)
/// - `Upstream`: External service errors (payment processor, email provider)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, etc.)
    Db(BoxError),
    /// External service rejected or failed the call
    Upstream { code: ErrorCode, message: String },
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl ServiceError {
    pub fn upstream(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError::Upstream {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Db(e) => write!(f, "backend error: {e}"),
            ServiceError::Upstream { message, .. } => write!(f, "upstream error: {message}"),
            ServiceError::App(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::database(db_err.to_string())
            }
            ServiceError::Upstream { code, message } => {
                tracing::error!(code = %code, error = %message, "Upstream service error");
                AppError::with_message(code, message)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_surface_message() {
        let err: AppError = ServiceError::Db("connection refused".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "connection refused");
    }

    #[test]
    fn upstream_errors_keep_code() {
        let err: AppError =
            ServiceError::upstream(ErrorCode::PaymentSetupFailed, "invalid token").into();
        assert_eq!(err.code, ErrorCode::PaymentSetupFailed);
        assert_eq!(err.http_status(), http::StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "invalid token");
    }

    #[test]
    fn app_errors_pass_through() {
        let err: AppError = ServiceError::App(AppError::new(ErrorCode::RoleRequired)).into();
        assert_eq!(err.code, ErrorCode::RoleRequired);
    }
}
