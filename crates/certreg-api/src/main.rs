//! # certreg-api: Binary Entry Point
//!
//! Wires backends from the environment and serves the registry over HTTP.
//!
//! Content store: HTTP gateway if `CERTREG_STORE_URL` is set, otherwise the
//! filesystem under `CERTREG_STORE_DIR`, otherwise memory. Ledger: Postgres
//! if `DATABASE_URL` is set and the `postgres` feature is enabled, otherwise
//! memory.

use std::sync::Arc;

use anyhow::Context;
use certreg_api::config::AppConfig;
use certreg_api::state::AppState;
use certreg_ledger::{Ledger, MemoryLedger};
use certreg_registry::{RegistryConfig, RegistryService};
use certreg_store::{
    ContentStore, FsContentStore, HttpContentStore, HttpStoreConfig, MemoryContentStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid server configuration")?;
    let registry_config = RegistryConfig::from_env().context("invalid registry configuration")?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let store = content_store(&config)?;
    let ledger = ledger(&config).await?;

    if config.tokens.is_empty() {
        tracing::warn!("CERTREG_API_TOKENS is empty; only public reads will succeed");
    }

    let registry = RegistryService::new(registry_config, store, ledger);
    let port = config.port;
    let state = AppState::new(registry, config).with_metrics(metrics);
    let app = certreg_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("certreg API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("certreg API stopped");
    Ok(())
}

/// `RUST_LOG` filter (default `info`); JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn content_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    let http = HttpStoreConfig::from_env().context("invalid content store configuration")?;
    if let Some(http) = http {
        tracing::info!(url = %http.base_url, "using HTTP content store");
        let store = HttpContentStore::new(http).context("failed to build HTTP content store")?;
        return Ok(Arc::new(store));
    }
    if let Some(dir) = &config.store_dir {
        tracing::info!(root = %dir.display(), "using filesystem content store");
        return Ok(Arc::new(FsContentStore::new(dir.clone())));
    }
    tracing::warn!("no content store configured; documents are kept in memory");
    Ok(Arc::new(MemoryContentStore::new()))
}

#[cfg(feature = "postgres")]
async fn ledger(config: &AppConfig) -> anyhow::Result<Arc<dyn Ledger>> {
    if let Some(url) = &config.database_url {
        let namespace = config.ledger_namespace.clone();
        let ledger = certreg_ledger::PgLedger::connect(url.as_str(), namespace)
            .await
            .context("failed to connect Postgres ledger")?;
        tracing::info!(namespace = %config.ledger_namespace, "using Postgres ledger");
        return Ok(Arc::new(ledger));
    }
    Ok(memory_ledger(config))
}

#[cfg(not(feature = "postgres"))]
async fn ledger(config: &AppConfig) -> anyhow::Result<Arc<dyn Ledger>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but this build lacks the `postgres` feature");
    }
    Ok(memory_ledger(config))
}

fn memory_ledger(config: &AppConfig) -> Arc<dyn Ledger> {
    tracing::warn!("using in-memory ledger; certificates are lost on restart");
    Arc::new(MemoryLedger::new(config.ledger_namespace.clone()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
