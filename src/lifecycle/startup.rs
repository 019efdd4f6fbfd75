//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize telemetry, the application and ancillary connections in order
//! - Hand the initialized pieces to a `Supervisor`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)
//! - Handles opened before a later failure are released by `Drop`

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::app::{AppError, Application, UpstreamApp};
use crate::config::{ConfigError, ServiceConfig};
use crate::connections::{Cache, CacheError, Database, DatabaseError, RedisCache, SqliteDatabase};
use crate::lifecycle::supervisor::{Resources, Supervisor};
use crate::observability::{NoopTelemetry, PrometheusTelemetry, Telemetry, TelemetryError};

/// Exit code used when startup fails.
pub const STARTUP_FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    #[error("Invalid metrics address: {0}")]
    MetricsAddress(#[from] std::net::AddrParseError),

    #[error("Telemetry initialization failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Application initialization failed: {0}")]
    App(#[from] AppError),

    #[error("Database connection failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache connection failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install signal handlers: {0}")]
    Signals(std::io::Error),
}

/// Initialize everything after configuration and logging, in order:
/// telemetry, application, database, cache.
pub async fn start(config: ServiceConfig) -> Result<Supervisor, StartupError> {
    let telemetry = init_telemetry(&config)?;

    let app: Arc<dyn Application> = Arc::new(UpstreamApp::new(&config.upstream)?);

    let database: Option<Arc<dyn Database>> = match &config.database {
        Some(database) => Some(Arc::new(SqliteDatabase::connect(database).await?)),
        None => None,
    };

    let cache: Option<Arc<dyn Cache>> = match &config.cache {
        Some(cache) => Some(Arc::new(RedisCache::connect(cache).await?)),
        None => None,
    };

    tracing::info!(
        database = database.is_some(),
        cache = cache.is_some(),
        "Subsystems initialized"
    );

    Ok(Supervisor::new(
        config,
        Resources {
            app,
            telemetry,
            database,
            cache,
        },
    ))
}

fn init_telemetry(config: &ServiceConfig) -> Result<Arc<dyn Telemetry>, StartupError> {
    if !config.observability.metrics_enabled {
        return Ok(Arc::new(NoopTelemetry));
    }

    let addr: SocketAddr = config.observability.metrics_address.parse()?;
    Ok(Arc::new(PrometheusTelemetry::install(addr)?))
}
