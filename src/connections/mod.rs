//! Ancillary connections subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     DatabaseConfig → database.rs (pool, verified with SELECT 1)
//!     CacheConfig    → cache.rs (RESP connection, verified with PING)
//!
//! Requests:
//!     /db    → Database::ping
//!     /redis → Cache::ping
//!
//! Shutdown:
//!     Cache::close → Database::close (each exactly once)
//! ```
//!
//! # Design Decisions
//! - Connections are opened once; failure to open is fatal to startup
//! - Handles are shared via Arc; the live connection sits behind an async
//!   lock so `close` waits for in-flight queries and is the last operation
//! - After `close`, every operation fails with a `Closed` error

pub mod cache;
pub mod database;

pub use cache::{Cache, CacheError, RedisCache, PONG};
pub use database::{Database, DatabaseError, SqliteDatabase};
