//! Application state for erp-cloud

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_sesv2::Client as SesClient;

use crate::auth::rate_limit::RateLimiter;
use crate::billing::catalog;
use crate::config::Config;
use crate::db::{self, BillingStore, PgStore};
use crate::email::{LogMailer, Mailer, SesMailer};
use crate::error::BoxError;
use crate::mercadopago::{MercadoPagoClient, PaymentGateway};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Backend store (PostgreSQL, or in-memory in development)
    pub store: Arc<dyn BillingStore>,
    /// Payment processor
    pub gateway: Arc<dyn PaymentGateway>,
    /// Transactional email
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    /// Rate limiter for checkout and email routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn BillingStore> = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await?),
            None if !config.is_development() => {
                return Err("DATABASE_URL must be set outside development".into());
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store with demo data");
                let owner = config
                    .super_admin_emails
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "owner@localhost".into());
                Arc::new(
                    db::memory::development_store(
                        catalog::default_plans(&config.default_currency),
                        &owner,
                    )
                    .await,
                )
            }
        };

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        if config.mp_access_token.is_none() {
            tracing::warn!("MP_ACCESS_TOKEN not set, checkout is disabled");
        }
        let gateway = Arc::new(MercadoPagoClient::new(
            http,
            config.mp_access_token.clone().unwrap_or_default(),
        ));

        let mailer: Arc<dyn Mailer> = match &config.ses_from_email {
            Some(from) => {
                let aws_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let ses = if let Some(region) = &config.ses_region {
                    let ses_config = aws_config
                        .to_builder()
                        .region(aws_config::Region::new(region.clone()))
                        .build();
                    SesClient::new(&ses_config)
                } else {
                    SesClient::new(&aws_config)
                };
                Arc::new(SesMailer::new(ses, from.clone()))
            }
            None => {
                tracing::warn!("SES_FROM_EMAIL not set, emails are logged only");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            store,
            gateway,
            mailer,
            config: Arc::new(config.clone()),
            rate_limiter: RateLimiter::new(),
        })
    }

    /// Case-insensitive match against the super admin allowlist
    pub fn is_super_admin(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        self.config.super_admin_emails.iter().any(|e| *e == email)
    }
}
