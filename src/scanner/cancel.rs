//! Cooperative cancellation for a running scan
//!
//! Workers check the signal before every page read and sleep on it while
//! backing off, so cancelling wakes a worker stuck at the backoff ceiling
//! immediately. A read already in flight is not interrupted.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared cancellation flag with an interruptible sleep
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// Create a signal that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every sleeper
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wakeup.notify_all();
    }

    /// Check if cancel has been called
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `true` if the sleep ended because of cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            self.inner
                .wakeup
                .wait_while_for(&mut cancelled, |cancelled| !*cancelled, duration);
        }
        *cancelled
    }
}
