//! Process lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Running → ShuttingDown: first shutdown trigger (compare-and-swap, wins once)
//! ShuttingDown → Stopped: teardown finished or timed out
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running = 0,
    ShuttingDown = 1,
    Stopped = 2,
}

impl From<u8> for Phase {
    fn from(val: u8) -> Self {
        match val {
            0 => Phase::Running,
            1 => Phase::ShuttingDown,
            _ => Phase::Stopped,
        }
    }
}

/// Shared lifecycle phase.
#[derive(Debug)]
pub struct LifecycleState {
    phase: AtomicU8,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Running as u8),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from(self.phase.load(Ordering::SeqCst))
    }

    /// Move from `Running` to `ShuttingDown`.
    ///
    /// Returns `false` if shutdown already began.
    pub fn begin_shutdown(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Running as u8,
                Phase::ShuttingDown as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn finish(&self) {
        self.phase.store(Phase::Stopped as u8, Ordering::SeqCst);
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}
