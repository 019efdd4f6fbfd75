//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (bound by the supervisor)
//!     → server.rs (Axum setup, tracing layer)
//!     → routing::matcher decides probe vs delegation
//!     → health::probes answers probes
//!     → app::Application answers everything else
//!     → Send to client
//! ```

pub mod server;

pub use server::{build_router, AppState, HttpServer};
