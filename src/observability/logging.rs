//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Environment, LogFormat, ServiceConfig};

/// Error returned when a global subscriber is already installed.
pub type LoggingError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Resolve the effective output format for a config.
pub fn effective_format(config: &ServiceConfig) -> LogFormat {
    match config.observability.log_format {
        Some(format) => format,
        None if config.env == Environment::Production => LogFormat::Json,
        None => LogFormat::Pretty,
    }
}

/// Install the global tracing subscriber.
pub fn init(config: &ServiceConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    match effective_format(config) {
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults_to_json() {
        let mut config = ServiceConfig::default();
        assert_eq!(effective_format(&config), LogFormat::Pretty);

        config.env = Environment::Production;
        assert_eq!(effective_format(&config), LogFormat::Json);

        config.observability.log_format = Some(LogFormat::Pretty);
        assert_eq!(effective_format(&config), LogFormat::Pretty);
    }
}
