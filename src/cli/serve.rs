use crate::core::config::{AppConfig, SERVE_URL_ENV};
use crate::providers::{HttpRateFetcher, QuoteShape};
use crate::server::{self, AppState};
use crate::store::SqliteRateStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Validates config, opens and migrates the store, and builds the request
/// state. Any failure here means the server must not start.
pub async fn prepare(config: &AppConfig) -> Result<AppState> {
    let url = config.require_serve_url()?;
    let fetcher = HttpRateFetcher::new(url, QuoteShape::UsdBrl, SERVE_URL_ENV)?;

    let store = SqliteRateStore::connect(&config.serve.database_path).await?;
    store.migrate().await?;

    Ok(AppState {
        provider: Arc::new(fetcher),
        repository: Arc::new(store),
        fetch_timeout: config.serve.fetch_timeout(),
        persist_timeout: config.serve.persist_timeout(),
    })
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let state = prepare(config).await?;

    let listener = TcpListener::bind(&config.serve.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.serve.bind))?;

    server::serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
