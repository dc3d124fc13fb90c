//! Shared types for erp-cloud
//!
//! Error types, response structures, billing domain models and
//! time utilities used by the service and its clients.

pub mod billing;
pub mod error;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
