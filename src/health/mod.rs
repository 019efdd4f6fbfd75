//! Health probe subsystem.
//!
//! # Probes
//! ```text
//! GET /        → liveness, plain text, never touches a connection
//! GET /health  → liveness, JSON, never touches a connection
//! GET /db      → readiness of the database (SELECT 1)
//! GET /redis   → readiness of the cache (PING)
//! ```
//!
//! # Design Decisions
//! - Probe failures become a fixed-shape 500 body; details go to the log only
//! - Liveness probes stay 200 regardless of connection state

pub mod probes;

pub use probes::{cache_probe, database_probe, health_probe, root_probe};
