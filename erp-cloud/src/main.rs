//! erp-cloud: subscription lifecycle service for the multi-tenant ERP
//!
//! Long-running service that:
//! - Provisions trials and reports each company's subscription
//! - Creates MercadoPago checkout preferences and settles payment webhooks
//! - Gates features by plan and handles cancellation
//! - Sends transactional email and scheduled renewal reminders

mod api;
mod auth;
mod billing;
mod config;
mod db;
mod email;
mod error;
mod mercadopago;
mod state;

use config::Config;
use error::BoxError;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting erp-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup(std::time::Duration::from_secs(300)).await;
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("erp-cloud HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
