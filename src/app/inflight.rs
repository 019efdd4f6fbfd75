//! In-flight request tracking for application teardown.
//!
//! # Responsibilities
//! - Count requests currently being forwarded
//! - Refuse new requests once draining starts
//! - Let teardown wait until the count reaches zero

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    active: AtomicU64,
    draining: AtomicBool,
    idle: Notify,
}

/// Tracks in-flight requests so teardown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<Inner>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request. Returns `None` once draining has started.
    pub fn track(&self) -> Option<InFlightGuard> {
        if self.inner.draining.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        // Re-check so a request admitted concurrently with `drain` is not lost.
        if self.inner.draining.load(Ordering::SeqCst) {
            release(&self.inner);
            return None;
        }
        Some(InFlightGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn active_count(&self) -> u64 {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// Stop admitting requests and wait until every tracked one finishes.
    pub async fn drain(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        loop {
            let idle = self.inner.idle.notified();
            if self.active_count() == 0 {
                return;
            }
            idle.await;
        }
    }
}

fn release(inner: &Inner) {
    if inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
        inner.idle.notify_waiters();
    }
}

/// Guard held for a request's lifetime. Decrements the count on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        release(&self.inner);
    }
}
