//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0)
//! - Check connection strings parse before anything is opened
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("shutdown.timeout_ms must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("database.url must not be empty")]
    EmptyDatabaseUrl,

    #[error("database.pool_size must be greater than zero")]
    ZeroPoolSize,

    #[error("cache.url is invalid: {0}")]
    InvalidCacheUrl(String),

    #[error("upstream.url is invalid: {0}")]
    InvalidUpstreamUrl(String),

    #[error("observability.metrics_address is invalid: {0}")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.shutdown.timeout_ms == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    if let Some(database) = &config.database {
        if database.url.trim().is_empty() {
            errors.push(ValidationError::EmptyDatabaseUrl);
        }
        if database.pool_size == 0 {
            errors.push(ValidationError::ZeroPoolSize);
        }
    }

    if let Some(cache) = &config.cache {
        match Url::parse(&cache.url) {
            Ok(url) if url.scheme() != "redis" => errors.push(ValidationError::InvalidCacheUrl(
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidCacheUrl("missing host".to_string()))
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidCacheUrl(e.to_string())),
        }
    }

    if let Some(upstream) = &config.upstream.url {
        match Url::parse(upstream) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::InvalidUpstreamUrl(
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidUpstreamUrl(e.to_string())),
        }
    }

    if config.observability.metrics_enabled {
        if let Err(e) = config.observability.metrics_address.parse::<SocketAddr>() {
            errors.push(ValidationError::InvalidMetricsAddress(e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
