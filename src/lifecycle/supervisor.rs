//! The lifecycle coordinator.
//!
//! Owns configuration, every handle opened during startup, the listener and
//! the lifecycle state. `run` serves until the first shutdown trigger and then
//! drives the shutdown sequence:
//!
//! ```text
//! pre-shutdown  log the trigger
//! shutdown      stop accepting → drain → app → telemetry → cache → database
//! finally       log completion
//! ```
//!
//! Drain plus teardown race the configured timeout; if the timer wins the
//! outcome is `TimedOut` and the caller must exit.

use std::fmt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::app::Application;
use crate::config::ServiceConfig;
use crate::connections::{Cache, Database};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::{
    run_isolated, ShutdownOptions, ShutdownOutcome, TeardownReport, TeardownStep,
};
use crate::lifecycle::signals::{ShutdownReceiver, ShutdownSignal};
use crate::lifecycle::startup::StartupError;
use crate::lifecycle::state::LifecycleState;
use crate::observability::Telemetry;

/// Handles opened during startup, each closed exactly once on shutdown.
#[derive(Clone)]
pub struct Resources {
    pub app: Arc<dyn Application>,
    pub telemetry: Arc<dyn Telemetry>,
    pub database: Option<Arc<dyn Database>>,
    pub cache: Option<Arc<dyn Cache>>,
}

/// Why shutdown started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    Signal(ShutdownSignal),
    /// Every `Shutdown` handle was dropped.
    SignalSourceClosed,
    /// The HTTP server stopped on its own.
    ServerExited(String),
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Signal(signal) => write!(f, "{}", signal),
            ShutdownTrigger::SignalSourceClosed => f.write_str("signal source closed"),
            ShutdownTrigger::ServerExited(reason) => write!(f, "server exited: {}", reason),
        }
    }
}

pub struct Supervisor {
    config: Arc<ServiceConfig>,
    resources: Resources,
    state: Arc<LifecycleState>,
}

impl Supervisor {
    pub fn new(config: ServiceConfig, resources: Resources) -> Self {
        Self {
            config: Arc::new(config),
            resources,
            state: Arc::new(LifecycleState::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<LifecycleState> {
        Arc::clone(&self.state)
    }

    pub fn has_database(&self) -> bool {
        self.resources.database.is_some()
    }

    pub fn has_cache(&self) -> bool {
        self.resources.cache.is_some()
    }

    /// Bind the listener on the configured host and port.
    pub async fn bind(&self) -> Result<TcpListener, StartupError> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;

        if let Ok(local) = listener.local_addr() {
            tracing::info!(port = local.port(), address = %local, "HTTP server listening");
        }
        Ok(listener)
    }

    /// Serve on `listener` until shutdown is triggered, then tear down.
    pub async fn run(self, listener: TcpListener, mut signals: ShutdownReceiver) -> ShutdownOutcome {
        let options = ShutdownOptions::from_config(&self.config);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = HttpServer::new(AppState {
            app: Arc::clone(&self.resources.app),
            database: self.resources.database.clone(),
            cache: self.resources.cache.clone(),
        });
        let mut server = tokio::spawn(server.serve(listener, async move {
            let _ = stop_rx.await;
        }));

        let (trigger, server) = tokio::select! {
            received = signals.recv() => {
                let trigger = match received {
                    Some(signal) => ShutdownTrigger::Signal(signal),
                    None => ShutdownTrigger::SignalSourceClosed,
                };
                (trigger, Some(server))
            }
            result = &mut server => {
                let reason = match result {
                    Ok(Ok(())) => "stopped".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };
                (ShutdownTrigger::ServerExited(reason), None)
            }
        };

        if !self.state.begin_shutdown() {
            tracing::warn!(trigger = %trigger, "Shutdown already in progress");
            return ShutdownOutcome::Completed(TeardownReport::default());
        }

        // Pre-shutdown: observational only.
        tracing::info!(signal = %trigger, "Shutdown signal received");

        let ignored = tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                tracing::warn!(signal = %signal, "Shutdown already in progress; ignoring signal");
            }
        });

        let steps = self.teardown_steps();
        let sequence = async move {
            let _ = stop_tx.send(());
            if let Some(server) = server {
                match server.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed while draining"),
                    Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
                }
            }
            run_isolated(steps, options.verbose).await
        };

        let outcome = match tokio::time::timeout(options.timeout, sequence).await {
            Ok(report) => ShutdownOutcome::Completed(report),
            Err(_) => ShutdownOutcome::TimedOut,
        };

        ignored.abort();
        self.state.finish();

        // Finally.
        match &outcome {
            ShutdownOutcome::Completed(report) => tracing::info!(
                failed_steps = report.failed.len(),
                "Shutdown complete"
            ),
            ShutdownOutcome::TimedOut => tracing::error!(
                timeout_ms = options.timeout.as_millis() as u64,
                "Shutdown timed out; forcing exit"
            ),
        }
        outcome
    }

    /// Teardown in fixed order: application, telemetry, cache, database.
    fn teardown_steps(&self) -> Vec<TeardownStep> {
        let mut steps = Vec::with_capacity(4);

        let app = Arc::clone(&self.resources.app);
        steps.push(TeardownStep::new("application", async move { app.teardown().await }));

        let telemetry = Arc::clone(&self.resources.telemetry);
        steps.push(TeardownStep::new("telemetry", async move { telemetry.flush().await }));

        if let Some(cache) = self.resources.cache.clone() {
            steps.push(TeardownStep::new("cache", async move { cache.close().await }));
        }

        if let Some(database) = self.resources.database.clone() {
            steps.push(TeardownStep::new("database", async move { database.close().await }));
        }

        steps
    }
}
