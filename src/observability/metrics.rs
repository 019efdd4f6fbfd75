//! Metrics collection and exposition.
//!
//! # Metrics
//! - `supervisor_requests_total` (counter): requests by route, status
//! - `supervisor_request_duration_seconds` (histogram): latency by route
//!
//! The exporter is a Prometheus scrape endpoint. Flushing renders a final
//! snapshot into the log and stops the exporter tasks.

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to build Prometheus exporter: {0}")]
    Build(#[from] metrics_exporter_prometheus::BuildError),

    #[error("A global metrics recorder is already installed")]
    RecorderInstalled,

    #[error("Exporter task failed: {0}")]
    Exporter(String),
}

/// Telemetry export that must be flushed on shutdown.
#[async_trait]
pub trait Telemetry: Send + Sync {
    /// Flush pending telemetry and stop exporting. Best-effort.
    async fn flush(&self) -> Result<(), TelemetryError>;
}

/// Telemetry sink used when metrics export is disabled.
#[derive(Debug, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl Telemetry for NoopTelemetry {
    async fn flush(&self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

struct ExporterTasks {
    exporter: JoinHandle<()>,
    upkeep: JoinHandle<()>,
}

/// Prometheus exporter installed as the global metrics recorder.
pub struct PrometheusTelemetry {
    handle: PrometheusHandle,
    tasks: Mutex<Option<ExporterTasks>>,
}

impl PrometheusTelemetry {
    /// Install the recorder and start serving scrapes on `addr`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install(addr: SocketAddr) -> Result<Self, TelemetryError> {
        let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::RecorderInstalled)?;

        let exporter = tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "Metrics exporter stopped");
            }
        });

        let upkeep_handle = handle.clone();
        let upkeep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
            loop {
                ticker.tick().await;
                upkeep_handle.run_upkeep();
            }
        });

        tracing::info!(address = %addr, "Metrics exporter listening");

        Ok(Self {
            handle,
            tasks: Mutex::new(Some(ExporterTasks { exporter, upkeep })),
        })
    }

    /// Current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl Telemetry for PrometheusTelemetry {
    async fn flush(&self) -> Result<(), TelemetryError> {
        let Some(tasks) = self.tasks.lock().await.take() else {
            return Ok(());
        };

        let snapshot = self.handle.render();
        let series = snapshot.lines().filter(|l| !l.starts_with('#')).count();
        tracing::info!(series, snapshot = %snapshot, "Final metrics snapshot");

        tasks.upkeep.abort();
        tasks.exporter.abort();
        match tasks.exporter.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(TelemetryError::Exporter(e.to_string())),
        }
    }
}

/// Record a completed request.
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!("supervisor_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("supervisor_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}
