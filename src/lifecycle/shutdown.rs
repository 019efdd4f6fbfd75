//! Shutdown sequencing.
//!
//! Teardown is an ordered list of named steps. Each step is awaited in turn
//! and its failure or panic is logged and recorded, never propagated, so one
//! resource failing to close cannot keep the next one open.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use crate::config::ServiceConfig;

/// Exit code used when the shutdown timeout forces termination.
pub const FORCED_EXIT_CODE: u8 = 2;

/// Boxed error accepted from any teardown step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Parameters of the shutdown hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOptions {
    /// Upper bound on drain plus teardown.
    pub timeout: Duration,
    /// Log every teardown step at info level instead of debug.
    pub verbose: bool,
}

impl ShutdownOptions {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            timeout: config.shutdown.timeout(),
            verbose: config.verbose_shutdown(),
        }
    }
}

/// One named teardown action.
pub struct TeardownStep {
    name: &'static str,
    action: BoxFuture<'static, Result<(), BoxError>>,
}

impl TeardownStep {
    /// Wrap a future. It is not polled until the step runs.
    pub fn new<F, E>(name: &'static str, action: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name,
            action: Box::pin(async move { action.await.map_err(Into::into) }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// What happened to each teardown step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub completed: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run every step in order, isolating failures.
pub async fn run_isolated(steps: Vec<TeardownStep>, verbose: bool) -> TeardownReport {
    let mut report = TeardownReport::default();

    for step in steps {
        if verbose {
            tracing::info!(step = step.name, "Running teardown step");
        } else {
            tracing::debug!(step = step.name, "Running teardown step");
        }

        match AssertUnwindSafe(step.action).catch_unwind().await {
            Ok(Ok(())) => report.completed.push(step.name),
            Ok(Err(e)) => {
                tracing::warn!(step = step.name, error = %e, "Teardown step failed; continuing");
                report.failed.push((step.name, e.to_string()));
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(step = step.name, panic = %message, "Teardown step panicked; continuing");
                report.failed.push((step.name, format!("panicked: {}", message)));
            }
        }
    }

    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Result of the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Drain and teardown finished within the timeout.
    Completed(TeardownReport),
    /// The timeout elapsed first; the process must exit regardless.
    TimedOut,
}

impl ShutdownOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownOutcome::Completed(_) => 0,
            ShutdownOutcome::TimedOut => FORCED_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, fail: bool) -> TeardownStep {
        let log = Arc::clone(log);
        TeardownStep::new(name, async move {
            log.lock().unwrap().push(name);
            if fail {
                Err(std::io::Error::other(format!("{} broke", name)))
            } else {
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_steps() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording(&log, "first", true),
            recording(&log, "second", false),
            recording(&log, "third", true),
            recording(&log, "fourth", false),
        ];

        let report = run_isolated(steps, true).await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third", "fourth"]);
        assert_eq!(report.completed, vec!["second", "fourth"]);
        assert_eq!(
            report.failed,
            vec![("first", "first broke".to_string()), ("third", "third broke".to_string())]
        );
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn panicking_step_is_recorded_and_later_steps_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            TeardownStep::new("application", async {
                if true {
                    panic!("teardown exploded");
                }
                Ok::<(), std::io::Error>(())
            }),
            recording(&log, "cache", false),
            recording(&log, "database", false),
        ];

        let report = run_isolated(steps, false).await;

        assert_eq!(*log.lock().unwrap(), vec!["cache", "database"]);
        assert_eq!(report.completed, vec!["cache", "database"]);
        assert_eq!(
            report.failed,
            vec![("application", "panicked: teardown exploded".to_string())]
        );
    }

    #[tokio::test]
    async fn steps_are_lazy() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let step = recording(&log, "lazy", false);
        assert_eq!(step.name(), "lazy");
        assert!(log.lock().unwrap().is_empty());

        let report = run_isolated(vec![step], false).await;
        assert!(report.is_clean());
        assert_eq!(*log.lock().unwrap(), vec!["lazy"]);
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_eq!(ShutdownOutcome::Completed(TeardownReport::default()).exit_code(), 0);
        assert_eq!(ShutdownOutcome::TimedOut.exit_code(), FORCED_EXIT_CODE);
    }

    #[test]
    fn options_follow_environment() {
        let mut config = ServiceConfig::default();
        config.shutdown.timeout_ms = 1500;
        let options = ShutdownOptions::from_config(&config);
        assert_eq!(options.timeout, Duration::from_millis(1500));
        assert!(options.verbose);
    }
}
