//! Presence timeline service binary.
//!
//! Wires together configuration, the `PostgreSQL` stores, the place
//! catalog and its refresh task, and the HTTP ingestion server, then
//! serves until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `presence-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Load the place catalog (fatal on failure)
//! 5. Spawn the catalog refresh task
//! 6. Serve HTTP until Ctrl-C, then drain and close the pool

mod error;
mod refresh;

use std::path::Path;
use std::sync::Arc;

use presence_api::{AppState, Recorder};
use presence_core::{PlaceCatalog, ServiceConfig};
use presence_db::{ConfigBackend, IntervalBackend, PostgresConfig, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "presence-config.yaml";

/// Application entry point for the presence server.
///
/// # Errors
///
/// Returns an error if configuration, the database, the initial catalog
/// load, or the HTTP listener fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration. Logging is not up yet, so report the source
    //    once the subscriber exists.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("presence-server starting");
    info!(
        from_file,
        port = config.server.port,
        refresh_interval_secs = config.catalog.refresh_interval_secs,
        max_accuracy_m = config.ingest.max_accuracy_m,
        max_gap_secs = config.ingest.max_gap_secs,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL.
    let pg_config = PostgresConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections)
        .with_connect_timeout(config.database.connect_timeout())
        .with_operation_timeout(config.database.operation_timeout());
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;

    // 4. Initial catalog load. Without places every ping would land in
    //    the world bucket, so refuse to start.
    let config_backend = ConfigBackend::from(pool.config_store());
    let places = config_backend.load_places().await?;
    info!(places = places.len(), "Place catalog loaded");
    let catalog = PlaceCatalog::new(places);

    // 5. Catalog refresh.
    let refresh_handle = refresh::spawn_catalog_refresh(
        catalog.clone(),
        config_backend.clone(),
        config.catalog.refresh_interval(),
    );

    // 6. Serve.
    let recorder = Recorder::new(
        catalog,
        IntervalBackend::from(pool.interval_store()),
        config_backend,
    )
    .with_policy(config.compaction_policy())
    .with_max_accuracy(config.ingest.max_accuracy_m);
    let state = Arc::new(AppState::new(recorder));

    let served = presence_api::start_server(&config.server, state, shutdown_signal()).await;

    refresh_handle.abort();
    pool.close().await;
    served?;

    info!("presence-server shutdown complete");
    Ok(())
}

/// Load and validate configuration from [`CONFIG_PATH`], falling back to
/// defaults (with environment overrides) when the file is absent.
fn load_config() -> Result<(ServiceConfig, bool), ServerError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((ServiceConfig::from_file(config_path)?, true))
    } else {
        let mut config = ServiceConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, false))
    }
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            // Without a signal handler, keep serving until killed.
            std::future::pending::<()>().await;
        }
    }
}
