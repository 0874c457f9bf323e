//! Oceanographic observation service.
//!
//! Ingests chlorophyll-a and surface current grids from NOAA ERDDAP on a
//! fixed interval, repairs missing cells by interpolation, and serves the
//! archive as GeoJSON over HTTP.

mod config;
mod scheduler;
mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use archive::Archive;
use erddap::ErddapClient;

use config::Config;
use scheduler::Updater;
use server::ServerState;

/// How long the query surface gets to drain open connections.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();

    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting ocean observation service");

    let bbox = config.bbox();
    if !bbox.is_valid() {
        bail!("invalid bounding box: {bbox:?}");
    }

    let archive = Arc::new(
        Archive::connect(&config.database_url())
            .await
            .context("failed to connect to database")?,
    );
    archive
        .ensure_schema()
        .await
        .context("failed to bootstrap archive schema")?;

    let client = ErddapClient::new(bbox).context("failed to build ERDDAP client")?;

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let updater = Updater::new(
        archive.clone(),
        client,
        Duration::from_secs(config.update_interval_secs),
        config.currents_dataset_id.clone(),
    );
    let updater_shutdown = shutdown_tx.subscribe();
    let updater_handle = tokio::spawn(async move {
        updater.run(updater_shutdown).await;
    });

    let state = Arc::new(ServerState {
        archive: archive.clone(),
        default_bbox: bbox,
    });
    let server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(server::run_server(state, config.port, server_shutdown));

    let mut main_shutdown = shutdown_tx.subscribe();

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    main_shutdown.recv().await.ok();

    info!("shutting down gracefully");

    match tokio::time::timeout(SHUTDOWN_DEADLINE, server_handle).await {
        Ok(Ok(Err(e))) => warn!(error = %e, "query server exited with error"),
        Ok(_) => {}
        Err(_) => warn!("query server did not drain within the shutdown deadline"),
    }
    updater_handle.await.ok();

    info!("graceful shutdown complete");
    Ok(())
}
