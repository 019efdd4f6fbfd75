//! HTTP service supervisor.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                  SUPERVISOR                   │
//!   Client Request     │  ┌──────────┐    ┌──────────┐                 │
//!   ───────────────────┼─▶│   http   │───▶│ routing  │──┐              │
//!                      │  │  server  │    │ matcher  │  │              │
//!                      │  └──────────┘    └──────────┘  │              │
//!                      │          ┌─────────────────────┤              │
//!                      │          ▼                     ▼              │
//!                      │  ┌──────────────┐     ┌────────────────┐      │
//!                      │  │ health probes│     │  application   │──────┼──▶ Upstream
//!                      │  │ / /health    │     │  (delegated)   │      │
//!                      │  │ /db /redis   │     └────────────────┘      │
//!                      │  └──────┬───────┘                             │
//!                      │         ▼                                     │
//!                      │  ┌──────────────┐  ┌───────────────────────┐  │
//!                      │  │ connections  │  │       lifecycle       │  │
//!                      │  │ sqlite/redis │  │ startup/signals/      │  │
//!                      │  └──────────────┘  │ shutdown              │  │
//!                      │                    └───────────────────────┘  │
//!                      └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use svc_supervisor::config::load_config;
use svc_supervisor::lifecycle::{
    self, signals, Shutdown, ShutdownOutcome, StartupError, STARTUP_FAILURE_EXIT_CODE,
};
use svc_supervisor::observability::logging;

#[derive(Parser)]
#[command(name = "svc-supervisor")]
#[command(about = "Process supervisor for an HTTP service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", StartupError::from(e));
            return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
        }
    };

    if let Err(e) = logging::init(&config) {
        eprintln!("{}", StartupError::Logging(e.to_string()));
        return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.env,
        port = config.listener.port,
        shutdown_timeout_ms = config.shutdown.timeout_ms,
        "svc-supervisor starting"
    );

    let outcome = match serve(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
        }
    };

    match outcome {
        ShutdownOutcome::Completed(_) => ExitCode::SUCCESS,
        // Pending teardown work may still hold runtime threads; do not wait for it.
        ShutdownOutcome::TimedOut => std::process::exit(i32::from(outcome.exit_code())),
    }
}

async fn serve(config: svc_supervisor::ServiceConfig) -> Result<ShutdownOutcome, StartupError> {
    let supervisor = lifecycle::start(config).await?;
    let listener = supervisor.bind().await?;

    let (shutdown, signals_rx) = Shutdown::channel();
    signals::listen(shutdown).map_err(StartupError::Signals)?;

    Ok(supervisor.run(listener, signals_rx).await)
}
