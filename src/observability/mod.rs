//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (JSON in production, text elsewhere)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments); the exporter is optional
//! - Telemetry is flushed during shutdown, after the application stops

pub mod logging;
pub mod metrics;

pub use metrics::{NoopTelemetry, PrometheusTelemetry, Telemetry, TelemetryError};
