//! Server binary for the flats catalog.
//!
//! Loads configuration, initializes logging, selects the storage backend
//! and serves the HTTP + `WebSocket` API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (defaults, file, environment)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and apply migrations, or create the
//!    in-memory catalog
//! 4. Wire the services and the shared application state
//! 5. Serve until shutdown, then close the pool

mod config;
mod error;

use std::sync::Arc;

use flats_api::{AppState, start_server};
use flats_core::Services;
use flats_db::{Catalog, CatalogPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LoggingConfig, StorageBackend};
use crate::error::AppError;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage setup or the server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.storage.backend,
        "flats-server starting"
    );

    let (catalog, pool) = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = CatalogPool::open(&config.database).await?;
            (Catalog::postgres(&pool), Some(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory catalog; data is lost on exit");
            (Catalog::in_memory(), None)
        }
    };

    let services = Services::new(&catalog, config.limits.store_timeout());
    let state = Arc::new(AppState::with_limits(services, config.limits.api_limits()));

    let served = start_server(&config.server, state).await;

    if let Some(pool) = pool {
        pool.close().await;
    }

    served?;
    info!("flats-server stopped");
    Ok(())
}
