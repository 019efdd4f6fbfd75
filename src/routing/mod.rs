//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → matcher.rs (method + path, query stripped)
//!     → Some(Probe)  → answered by the health subsystem
//!     → None         → delegated to the application
//! ```
//!
//! # Design Decisions
//! - Fixed table, exact matches only, evaluated in priority order
//! - Matching is a pure function so it can be tested without a server

pub mod matcher;

pub use matcher::{match_probe, request_path, Probe};
