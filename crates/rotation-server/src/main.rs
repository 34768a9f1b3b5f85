//! Layer rotation server binary.
//!
//! Wires configuration, structured logging, the NATS queue state
//! upstream, the layer catalog, and the operator API server together.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`ROTATION_CONFIG`, default
//!    `rotation-config.yaml`; defaults when the file is absent)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the queue state upstream (NATS, unless disabled)
//! 4. Assemble the service: columns, catalog, filters, queue channel
//! 5. Serve the operator API until `Ctrl-C`
//! 6. Dispose the queue channel

mod error;
mod nats_upstream;

use std::path::PathBuf;
use std::sync::Arc;

use rotation_core::{LogFormat, LoggingConfig, RotationService, ServiceConfig};
use rotation_fanout::{LocalUpstream, UpstreamSource};
use rotation_observer::{AppState, ServerConfig};
use rotation_types::QueueStateUpdate;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::nats_upstream::NatsUpstream;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "rotation-config.yaml";

/// Application entry point for the rotation server.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("rotation-server starting");
    info!(
        path = %config_path.display(),
        extension_file = ?config.columns.extension_file,
        rows_file = ?config.catalog.rows_file,
        upstream_enabled = config.upstream.enabled,
        observer_port = config.observer.port,
        "Configuration loaded"
    );

    // 3. Connect the queue state upstream.
    let upstream = connect_upstream(&config).await?;

    // 4. Assemble the service.
    let service =
        Arc::new(RotationService::from_config(&config, upstream).map_err(ServerError::from)?);
    info!(
        columns = service.columns().current().len(),
        "Rotation service assembled"
    );

    // 5. Serve the operator API.
    let state = Arc::new(AppState::new(Arc::clone(&service)));
    let server_config = ServerConfig::from(&config.observer);
    rotation_observer::start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(ServerError::from)?;

    // 6. Complete every remaining queue subscriber.
    service.shutdown();
    info!("rotation-server shutdown complete");
    Ok(())
}

/// Load the configuration file named by `ROTATION_CONFIG`, falling back
/// to [`DEFAULT_CONFIG_PATH`].
///
/// A missing file yields the defaults with environment overrides applied.
fn load_config() -> Result<(ServiceConfig, PathBuf), ServerError> {
    let path = std::env::var_os("ROTATION_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if path.exists() {
        ServiceConfig::from_file(&path)?
    } else {
        ServiceConfig::parse("")?
    };
    Ok((config, path))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Build the queue state upstream described by the configuration.
async fn connect_upstream(
    config: &ServiceConfig,
) -> Result<Arc<dyn UpstreamSource<QueueStateUpdate>>, ServerError> {
    if !config.upstream.enabled {
        warn!("Queue state upstream disabled, subscribers will stay pending");
        return Ok(Arc::new(LocalUpstream::<QueueStateUpdate>::new()));
    }
    let url = &config.upstream.nats_url;
    info!(nats_url = url, subject = config.upstream.subject, "Connecting to NATS");
    let upstream = NatsUpstream::connect(url, config.upstream.subject.clone()).await?;
    info!("NATS queue state upstream connected");
    Ok(Arc::new(upstream))
}

/// Resolve on `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown signal received");
}
