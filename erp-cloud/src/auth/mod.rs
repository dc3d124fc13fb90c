//! Authentication middleware for session and cron callers

pub mod cron_auth;
pub mod rate_limit;
pub mod session_auth;

pub use session_auth::Principal;
