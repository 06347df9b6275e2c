//! Completion tracking for segment workers
//!
//! The orchestrator owns the [`CompletionTracker`]. Each worker only holds a
//! [`SegmentGuard`]; dropping it (normal exit, cancellation or unwinding from
//! a panicking handler) releases exactly one unit.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    outstanding: Mutex<usize>,
    zero: Condvar,
}

/// Counts outstanding workers and lets callers block until none remain
#[derive(Debug, Default)]
pub(crate) struct CompletionTracker {
    inner: Arc<Inner>,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register one worker; the returned guard releases it on drop
    pub(crate) fn register(&self) -> SegmentGuard {
        *self.inner.outstanding.lock() += 1;
        SegmentGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of workers that have not finished
    pub(crate) fn outstanding(&self) -> usize {
        *self.inner.outstanding.lock()
    }

    /// Block until every registered worker has finished
    pub(crate) fn wait(&self) {
        let mut outstanding = self.inner.outstanding.lock();
        while *outstanding > 0 {
            self.inner.zero.wait(&mut outstanding);
        }
    }

    /// Block for at most `timeout`; returns true if all workers finished
    ///
    /// A timeout too large to express as an `Instant` waits without a bound.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut outstanding = self.inner.outstanding.lock();
        while *outstanding > 0 {
            if self.inner.zero.wait_until(&mut outstanding, deadline).timed_out() {
                return *outstanding == 0;
            }
        }
        true
    }
}

/// RAII guard marking one worker as outstanding
#[derive(Debug)]
pub(crate) struct SegmentGuard {
    inner: Arc<Inner>,
}

impl Drop for SegmentGuard {
    fn drop(&mut self) {
        let mut outstanding = self.inner.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.inner.zero.notify_all();
        }
    }
}
