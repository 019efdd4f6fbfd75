//! Delegated application subsystem.
//!
//! # Data Flow
//! ```text
//! Request not answered by a probe
//!     → Application::dispatch (upstream.rs forwards it)
//!     → Response returned unchanged to the client
//!
//! Shutdown:
//!     Application::teardown → inflight.rs drains outstanding requests
//! ```
//!
//! # Design Decisions
//! - The supervisor only sees the `Application` trait; any handler can be plugged in
//! - Requests are handed over verbatim (method, URI, headers, body)
//! - Teardown refuses new work before waiting for in-flight work

pub mod inflight;
pub mod upstream;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use thiserror::Error;

pub use inflight::{InFlightGuard, InFlightTracker};
pub use upstream::UpstreamApp;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUpstream(String),

    #[error("Teardown failed: {0}")]
    Teardown(String),
}

/// The application the supervisor delegates unmatched requests to.
#[async_trait]
pub trait Application: Send + Sync {
    /// Produce a response for a request the router did not answer itself.
    async fn dispatch(&self, request: Request<Body>) -> Response;

    /// Release application resources. Must eventually settle.
    async fn teardown(&self) -> Result<(), AppError>;
}
