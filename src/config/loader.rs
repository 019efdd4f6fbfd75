//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{CacheConfig, DatabaseConfig, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from an optional TOML file plus the
/// process environment (including a `.env` file if present).
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a parsed config.
///
/// Recognised: `PORT`, `APP_ENV`, `SHUTDOWN_TIMEOUT_MS`, `DATABASE_URL`,
/// `REDIS_URL`, `UPSTREAM_URL`, `LOG_LEVEL`, `LOG_FORMAT`, `METRICS_ADDRESS`.
pub fn apply_env_overrides<F>(mut config: ServiceConfig, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = port.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            var: "PORT",
            reason: e.to_string(),
        })?;
    }

    if let Some(env) = lookup("APP_ENV") {
        config.env = env
            .parse()
            .map_err(|reason| ConfigError::Env { var: "APP_ENV", reason })?;
    }

    if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_MS") {
        config.shutdown.timeout_ms =
            timeout.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
                var: "SHUTDOWN_TIMEOUT_MS",
                reason: e.to_string(),
            })?;
    }

    if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
        match config.database.as_mut() {
            Some(database) => database.url = url,
            None => config.database = Some(DatabaseConfig::new(url)),
        }
    }

    if let Some(url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
        match config.cache.as_mut() {
            Some(cache) => cache.url = url,
            None => config.cache = Some(CacheConfig::new(url)),
        }
    }

    if let Some(url) = lookup("UPSTREAM_URL").filter(|v| !v.is_empty()) {
        config.upstream.url = Some(url);
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = Some(
            format
                .parse()
                .map_err(|reason| ConfigError::Env { var: "LOG_FORMAT", reason })?,
        );
    }

    if let Some(address) = lookup("METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = address;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Environment;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let config = apply_env_overrides(
            ServiceConfig::default(),
            env(&[
                ("PORT", "8081"),
                ("APP_ENV", "production"),
                ("SHUTDOWN_TIMEOUT_MS", "2500"),
                ("DATABASE_URL", "sqlite://data.db"),
                ("REDIS_URL", "redis://cache:6379"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.port, 8081);
        assert_eq!(config.env, Environment::Production);
        assert_eq!(config.shutdown.timeout_ms, 2500);
        assert_eq!(config.database.unwrap().url, "sqlite://data.db");
        assert_eq!(config.cache.unwrap().url, "redis://cache:6379");
    }

    #[test]
    fn empty_connection_strings_are_ignored() {
        let config =
            apply_env_overrides(ServiceConfig::default(), env(&[("DATABASE_URL", ""), ("REDIS_URL", "")]))
                .unwrap();
        assert!(config.database.is_none());
        assert!(config.cache.is_none());
    }

    #[test]
    fn bad_port_is_reported_by_name() {
        let err = apply_env_overrides(ServiceConfig::default(), env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "PORT", .. }));
    }

    #[test]
    fn loads_file_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[shutdown]\ntimeout_ms = 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
