//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with a single dispatching handler
//! - Answer probe routes directly
//! - Hand every other request to the delegated application untouched
//! - Serve until told to stop, then drain in-flight connections

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::app::Application;
use crate::connections::{Cache, Database};
use crate::health::{cache_probe, database_probe, health_probe, root_probe};
use crate::observability::metrics;
use crate::routing::{match_probe, Probe};

/// Shared handles injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<dyn Application>,
    pub database: Option<Arc<dyn Database>>,
    pub cache: Option<Arc<dyn Cache>>,
}

/// Build the Axum router. Every request goes through `dispatch`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server for the supervisor.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Serve on `listener` until `stop` resolves, then drain open connections.
    pub async fn serve<F>(self, listener: TcpListener, stop: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(stop)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Probe interception, falling through to the application.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let target = request.uri().path_and_query().map(|pq| pq.as_str());
    let probe = match_probe(request.method(), target);

    let response = match (probe, &state.database, &state.cache) {
        (Some(Probe::Root), _, _) => root_probe(),
        (Some(Probe::Health), _, _) => health_probe(),
        (Some(Probe::Database), Some(database), _) => database_probe(database.as_ref()).await,
        (Some(Probe::Cache), _, Some(cache)) => cache_probe(cache.as_ref()).await,
        _ => {
            let response = state.app.dispatch(request).await;
            metrics::record_request("app", response.status().as_u16(), start);
            return response;
        }
    };

    if let Some(probe) = probe {
        metrics::record_request(probe.label(), response.status().as_u16(), start);
    }
    response
}
