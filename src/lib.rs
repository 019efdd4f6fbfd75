//! HTTP service supervisor library.

pub mod app;
pub mod config;
pub mod connections;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, Supervisor};
