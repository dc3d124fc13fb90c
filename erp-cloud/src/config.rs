//! Service configuration

use crate::error::BoxError;

/// Service configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL; in development an in-memory store is used
    /// when unset
    pub database_url: Option<String>,
    pub http_port: u16,
    /// MercadoPago access token (checkout fails with a config error when unset)
    pub mp_access_token: Option<String>,
    /// MercadoPago webhook secret; signatures are verified only when set
    pub mp_webhook_secret: Option<String>,
    /// Redirect buyers to the sandbox checkout
    pub mp_sandbox: bool,
    /// Currency used when a plan has none
    pub default_currency: String,
    /// Public base URL for back URLs and the notification URL
    pub app_base_url: String,
    /// Bearer secret for the cron endpoint
    pub cron_secret: Option<String>,
    /// HS256 secret of the auth provider's session tokens
    pub jwt_secret: String,
    /// SES sender address; emails are only logged when unset
    pub ses_from_email: Option<String>,
    pub ses_region: Option<String>,
    /// Lowercased allowlist
    pub super_admin_emails: Vec<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match lookup(name) {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let non_empty = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        Ok(Self {
            database_url,
            http_port: lookup("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            mp_access_token: non_empty("MP_ACCESS_TOKEN"),
            mp_webhook_secret: non_empty("MP_WEBHOOK_SECRET"),
            mp_sandbox: lookup("MP_SANDBOX")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            default_currency: non_empty("DEFAULT_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or_else(|| "ARS".into()),
            app_base_url: non_empty("APP_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".into()),
            cron_secret: non_empty("CRON_SECRET"),
            jwt_secret: Self::require_secret(&lookup, "JWT_SECRET", &environment)?,
            ses_from_email: non_empty("SES_FROM_EMAIL"),
            ses_region: non_empty("SES_REGION"),
            super_admin_emails: parse_email_list(&lookup("SUPER_ADMIN_EMAILS").unwrap_or_default()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Split a comma separated list, trimming and lowercasing each entry
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, BoxError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |name| map.get(name).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.is_development());
        assert!(config.database_url.is_none());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.default_currency, "ARS");
        assert!(!config.mp_sandbox);
        assert!(config.cron_secret.is_none());
        assert_eq!(config.jwt_secret, "dev-JWT_SECRET-not-for-production");
    }

    #[test]
    fn production_requires_database_and_jwt_secret() {
        assert!(load(&[("ENVIRONMENT", "production")]).is_err());
        assert!(
            load(&[
                ("ENVIRONMENT", "production"),
                ("DATABASE_URL", "postgres://db/erp"),
            ])
            .is_err()
        );
        assert!(
            load(&[
                ("ENVIRONMENT", "production"),
                ("DATABASE_URL", "postgres://db/erp"),
                ("JWT_SECRET", ""),
            ])
            .is_err()
        );
        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "postgres://db/erp"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn parses_flags_and_lists() {
        let config = load(&[
            ("MP_SANDBOX", "TRUE"),
            ("DEFAULT_CURRENCY", " usd "),
            ("APP_BASE_URL", "https://erp.example.com/"),
            ("SUPER_ADMIN_EMAILS", "Root@Example.com, ops@example.com,,"),
            ("MP_ACCESS_TOKEN", "  "),
        ])
        .unwrap();
        assert!(config.mp_sandbox);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.app_base_url, "https://erp.example.com");
        assert_eq!(
            config.super_admin_emails,
            vec!["root@example.com", "ops@example.com"]
        );
        assert!(config.mp_access_token.is_none());
    }
}
