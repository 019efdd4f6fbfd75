//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Forward every received signal to the supervisor
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every signal is forwarded; the supervisor acts on the first and logs the rest

use std::fmt;
use tokio::sync::mpsc;

/// A termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Terminate,
    Interrupt,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// Sending half used to request shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: mpsc::UnboundedSender<ShutdownSignal>,
}

/// Receiving half consumed by the supervisor.
pub type ShutdownReceiver = mpsc::UnboundedReceiver<ShutdownSignal>;

impl Shutdown {
    pub fn channel() -> (Self, ShutdownReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Request shutdown. Returns `false` once the supervisor is gone.
    pub fn trigger(&self, signal: ShutdownSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// Forward SIGTERM/SIGINT to `shutdown` for the rest of the process lifetime.
pub fn listen(shutdown: Shutdown) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = sigterm.recv() => ShutdownSignal::Terminate,
                    Some(()) = sigint.recv() => ShutdownSignal::Interrupt,
                    else => break,
                };
                if !shutdown.trigger(received) {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !shutdown.trigger(ShutdownSignal::Interrupt) {
                    break;
                }
            }
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_trigger_is_delivered_in_order() {
        let (shutdown, mut rx) = Shutdown::channel();
        assert!(shutdown.trigger(ShutdownSignal::Terminate));
        assert!(shutdown.trigger(ShutdownSignal::Interrupt));

        assert_eq!(rx.recv().await, Some(ShutdownSignal::Terminate));
        assert_eq!(rx.recv().await, Some(ShutdownSignal::Interrupt));
    }

    #[test]
    fn trigger_after_receiver_dropped() {
        let (shutdown, rx) = Shutdown::channel();
        drop(rx);
        assert!(!shutdown.trigger(ShutdownSignal::Terminate));
    }

    #[test]
    fn signal_names() {
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
    }
}
