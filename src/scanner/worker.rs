//! Segment worker
//!
//! Each worker:
//! - Owns one global segment index for its whole life
//! - Reads that segment page by page, chaining continuation cursors
//! - Hands every page to the handler before asking for the next one
//! - Retries failed reads with backoff, never advancing the cursor on failure
//!
//! ```text
//! Init ──▶ Fetching ──ok──▶ Handling ──more──▶ Fetching
//!             │  ▲             │
//!           error│             └──last page──▶ Done
//!             ▼  │
//!            Backoff ──cancel / retry policy exhausted──▶ Done
//! ```

use crate::config::ScanConfig;
use crate::error::WorkerError;
use crate::scanner::backoff::Backoff;
use crate::scanner::cancel::CancelSignal;
use crate::scanner::handler::ItemHandler;
use crate::scanner::tracker::SegmentGuard;
use crate::storage::{PageRequest, SegmentReader};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where a segment worker is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SegmentPhase {
    /// Spawned, no read issued yet
    Init = 0,
    /// Waiting on the storage client
    Fetching = 1,
    /// Sleeping after a failed read
    Backoff = 2,
    /// Inside the handler
    Handling = 3,
    /// Finished; terminal
    Done = 4,
}

impl SegmentPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SegmentPhase::Init,
            1 => SegmentPhase::Fetching,
            2 => SegmentPhase::Backoff,
            3 => SegmentPhase::Handling,
            _ => SegmentPhase::Done,
        }
    }
}

/// How a segment worker finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Every page of the segment was read and handled
    Exhausted,

    /// Stopped by the scan's cancellation signal
    Cancelled,

    /// Retry policy ran out on a failing read
    GaveUp { error: String },

    /// The handler panicked on this worker's thread
    Panicked,
}

impl SegmentOutcome {
    /// Returns true if the whole segment was delivered
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SegmentOutcome::Exhausted)
    }
}

/// Statistics collected by a segment worker
#[derive(Debug)]
pub struct SegmentStats {
    segment: u32,

    /// Pages read successfully
    pub pages: AtomicU64,

    /// Items handed to the handler
    pub items: AtomicU64,

    /// Failed reads
    pub failures: AtomicU64,

    last_delay_nanos: AtomicU64,
    phase: AtomicU8,
    outcome: Mutex<Option<SegmentOutcome>>,
}

impl SegmentStats {
    /// Create empty statistics for a segment
    pub fn new(segment: u32) -> Self {
        Self {
            segment,
            pages: AtomicU64::new(0),
            items: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_delay_nanos: AtomicU64::new(0),
            phase: AtomicU8::new(SegmentPhase::Init as u8),
            outcome: Mutex::new(None),
        }
    }

    /// Global segment index
    pub fn segment(&self) -> u32 {
        self.segment
    }

    /// Current phase
    pub fn phase(&self) -> SegmentPhase {
        SegmentPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    /// Final outcome, if the worker has finished
    pub fn outcome(&self) -> Option<SegmentOutcome> {
        self.outcome.lock().clone()
    }

    /// Most recent backoff delay (zero before the first failure)
    pub fn last_delay(&self) -> Duration {
        Duration::from_nanos(self.last_delay_nanos.load(Ordering::Relaxed))
    }

    fn set_phase(&self, phase: SegmentPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    fn record_page(&self, items: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_add(items as u64, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delay(&self, delay: Duration) {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        self.last_delay_nanos.store(nanos, Ordering::Relaxed);
    }

    /// Record the outcome (first one wins) and enter `Done`
    fn finish(&self, outcome: SegmentOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.set_phase(SegmentPhase::Done);
    }

    /// Point-in-time report
    pub fn report(&self) -> SegmentReport {
        SegmentReport {
            segment: self.segment,
            pages: self.pages.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            phase: self.phase(),
            outcome: self.outcome(),
        }
    }
}

/// Snapshot of one segment's statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    pub segment: u32,
    pub pages: u64,
    pub items: u64,
    pub failures: u64,
    pub phase: SegmentPhase,
    pub outcome: Option<SegmentOutcome>,
}

/// A worker thread scanning one segment
pub struct SegmentWorker {
    segment: u32,
    handle: Option<JoinHandle<()>>,
    stats: Arc<SegmentStats>,
}

impl SegmentWorker {
    /// Spawn a worker thread for `segment`
    ///
    /// `guard` is released when the thread exits, whichever way it exits. If
    /// the thread cannot be spawned it is released immediately.
    pub(crate) fn spawn<C, H>(
        segment: u32,
        config: Arc<ScanConfig<C>>,
        handler: Arc<H>,
        cancel: CancelSignal,
        guard: SegmentGuard,
    ) -> Result<Self, WorkerError>
    where
        C: SegmentReader + 'static,
        H: ItemHandler<C::Item> + ?Sized + 'static,
    {
        let stats = Arc::new(SegmentStats::new(segment));
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("scan-seg-{}", segment))
            .spawn(move || {
                let _exit = ExitGuard {
                    stats: Arc::clone(&stats_clone),
                    _tracker: guard,
                };

                info!(segment, table = %config.table_name, "Segment worker starting");
                let outcome = scan_segment(segment, &config, &*handler, &cancel, &stats_clone);
                info!(
                    segment,
                    pages = stats_clone.pages.load(Ordering::Relaxed),
                    items = stats_clone.items.load(Ordering::Relaxed),
                    outcome = ?outcome,
                    "Segment worker finished"
                );
                stats_clone.finish(outcome);
            })
            .map_err(|e| WorkerError::SpawnFailed {
                segment,
                reason: e.to_string(),
            })?;

        Ok(Self {
            segment,
            handle: Some(handle),
            stats,
        })
    }

    /// Global segment index
    pub fn segment(&self) -> u32 {
        self.segment
    }

    /// Worker statistics
    pub fn stats(&self) -> &SegmentStats {
        &self.stats
    }

    /// Join the thread if it has not been joined yet
    ///
    /// Returns false if the thread panicked.
    pub(crate) fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

/// Runs on thread exit: records a panic and releases the tracker
struct ExitGuard {
    stats: Arc<SegmentStats>,
    _tracker: SegmentGuard,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(segment = self.stats.segment(), "Handler panicked, segment abandoned");
            self.stats.finish(SegmentOutcome::Panicked);
        } else {
            self.stats.set_phase(SegmentPhase::Done);
        }
    }
}

/// Read one segment to the end, delivering every page to `handler`
///
/// Handler panics are not caught here: they unwind out of this function and
/// end the calling thread.
pub(crate) fn scan_segment<C, H>(
    segment: u32,
    config: &ScanConfig<C>,
    handler: &H,
    cancel: &CancelSignal,
    stats: &SegmentStats,
) -> SegmentOutcome
where
    C: SegmentReader,
    H: ItemHandler<C::Item> + ?Sized,
{
    let mut cursor: Option<C::Cursor> = None;
    let mut backoff = Backoff::new(config.backoff);
    let mut failures: u32 = 0;
    let mut streak_start: Option<Instant> = None;

    loop {
        if cancel.is_cancelled() {
            return SegmentOutcome::Cancelled;
        }

        stats.set_phase(SegmentPhase::Fetching);
        let result = config.client.read_page(PageRequest {
            table: &config.table_name,
            segment,
            total_segments: config.total_segments,
            start: cursor.as_ref(),
            limit: config.limit,
        });

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                stats.record_failure();
                failures = failures.saturating_add(1);
                let streak = streak_start.get_or_insert_with(Instant::now).elapsed();

                if !config.retry.should_retry(failures, streak) {
                    error!(
                        segment,
                        attempts = failures,
                        error = %e,
                        "Retry policy exhausted, giving up on segment"
                    );
                    return SegmentOutcome::GaveUp {
                        error: e.to_string(),
                    };
                }

                let delay = backoff.next_delay();
                stats.record_delay(delay);
                let delay_ms = delay.as_millis() as u64;
                if e.is_throttle() {
                    warn!(segment, attempt = failures, delay_ms, error = %e, "Read throttled, backing off");
                } else {
                    warn!(segment, attempt = failures, delay_ms, error = %e, "Read failed, backing off");
                }

                stats.set_phase(SegmentPhase::Backoff);
                if cancel.sleep(delay) {
                    return SegmentOutcome::Cancelled;
                }
                continue;
            }
        };

        backoff.reset();
        failures = 0;
        streak_start = None;

        stats.record_page(page.items.len());
        debug!(segment, items = page.items.len(), last = page.is_last(), "Page read");

        stats.set_phase(SegmentPhase::Handling);
        handler.handle_items(page.items);

        match page.next {
            Some(next) => cursor = Some(next),
            None => return SegmentOutcome::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::scanner::backoff::BackoffConfig;
    use crate::scanner::retry::RetryPolicy;
    use crate::storage::Page;
    use std::collections::VecDeque;

    /// Replays scripted responses and records every request's cursor
    struct ScriptedReader {
        responses: Mutex<VecDeque<StorageResult<Page<u32, String>>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedReader {
        fn new(responses: Vec<StorageResult<Page<u32, String>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().clone()
        }
    }

    impl SegmentReader for ScriptedReader {
        type Item = u32;
        type Cursor = String;

        fn read_page(&self, request: PageRequest<'_, String>) -> StorageResult<Page<u32, String>> {
            self.cursors.lock().push(request.start.cloned());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(StorageError::InvalidRequest("script exhausted".into())))
        }
    }

    fn throttled() -> StorageResult<Page<u32, String>> {
        Err(StorageError::Throttled {
            message: "slow down".into(),
        })
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            min: Duration::from_millis(1),
            max: Duration::from_millis(4),
            ..BackoffConfig::default()
        }
    }

    fn config(reader: ScriptedReader, retry: RetryPolicy) -> ScanConfig<ScriptedReader> {
        ScanConfig::builder("t", Arc::new(reader))
            .backoff(fast_backoff())
            .retry(retry)
            .build()
            .unwrap()
    }

    fn run(config: &ScanConfig<ScriptedReader>) -> (SegmentOutcome, Vec<Vec<u32>>, SegmentStats) {
        let pages = Mutex::new(Vec::new());
        let handler = |items: Vec<u32>| pages.lock().push(items);
        let stats = SegmentStats::new(0);
        let outcome = scan_segment(0, config, &handler, &CancelSignal::new(), &stats);
        (outcome, pages.into_inner(), stats)
    }

    #[test]
    fn test_reads_all_pages_in_order() {
        let reader = ScriptedReader::new(vec![
            Ok(Page::more(vec![1, 2], "a".into())),
            Ok(Page::more(vec![3], "b".into())),
            Ok(Page::last(vec![4, 5])),
        ]);
        let config = config(reader, RetryPolicy::Forever);

        let (outcome, pages, stats) = run(&config);

        assert_eq!(outcome, SegmentOutcome::Exhausted);
        assert_eq!(pages, vec![vec![1, 2], vec![3], vec![4, 5]]);
        assert_eq!(stats.pages.load(Ordering::Relaxed), 3);
        assert_eq!(stats.items.load(Ordering::Relaxed), 5);
        assert_eq!(
            config.client.cursors(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn test_retry_keeps_cursor() {
        let reader = ScriptedReader::new(vec![
            Ok(Page::more(vec![1], "a".into())),
            throttled(),
            Err(StorageError::Unavailable("connection reset".into())),
            throttled(),
            Ok(Page::last(vec![2, 3])),
        ]);
        let config = config(reader, RetryPolicy::Forever);

        let (outcome, pages, stats) = run(&config);

        assert_eq!(outcome, SegmentOutcome::Exhausted);
        assert_eq!(pages, vec![vec![1], vec![2, 3]]);
        assert_eq!(stats.failures.load(Ordering::Relaxed), 3);

        let cursors = config.client.cursors();
        assert_eq!(cursors.len(), 5);
        assert_eq!(cursors[0], None);
        assert!(cursors[1..].iter().all(|c| c.as_deref() == Some("a")));
    }

    #[test]
    fn test_empty_pages_are_delivered() {
        let reader = ScriptedReader::new(vec![
            Ok(Page::more(vec![], "a".into())),
            Ok(Page::last(vec![])),
        ]);
        let config = config(reader, RetryPolicy::Forever);

        let (outcome, pages, _) = run(&config);
        assert_eq!(outcome, SegmentOutcome::Exhausted);
        assert_eq!(pages, vec![Vec::<u32>::new(), Vec::new()]);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let reader = ScriptedReader::new(vec![throttled(), throttled(), throttled(), Ok(Page::last(vec![1]))]);
        let config = config(reader, RetryPolicy::MaxAttempts(2));

        let (outcome, pages, stats) = run(&config);

        assert!(matches!(outcome, SegmentOutcome::GaveUp { ref error } if error.contains("slow down")));
        assert!(pages.is_empty());
        assert_eq!(stats.failures.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_failure_streak_resets_after_success() {
        let reader = ScriptedReader::new(vec![
            throttled(),
            Ok(Page::more(vec![1], "a".into())),
            throttled(),
            Ok(Page::last(vec![2])),
        ]);
        let config = config(reader, RetryPolicy::MaxAttempts(2));

        let (outcome, pages, _) = run(&config);
        assert_eq!(outcome, SegmentOutcome::Exhausted);
        assert_eq!(pages, vec![vec![1], vec![2]]);
    }

    /// Wraps a scripted reader and notes the worker's last backoff delay at
    /// every read
    struct DelayRecordingReader {
        inner: ScriptedReader,
        stats: Arc<SegmentStats>,
        seen: Mutex<Vec<Duration>>,
    }

    impl SegmentReader for DelayRecordingReader {
        type Item = u32;
        type Cursor = String;

        fn read_page(&self, request: PageRequest<'_, String>) -> StorageResult<Page<u32, String>> {
            self.seen.lock().push(self.stats.last_delay());
            self.inner.read_page(request)
        }
    }

    #[test]
    fn test_success_resets_backoff_to_baseline() {
        let stats = Arc::new(SegmentStats::new(0));
        let reader = DelayRecordingReader {
            inner: ScriptedReader::new(vec![
                throttled(),
                throttled(),
                Ok(Page::more(vec![1], "a".into())),
                throttled(),
                Ok(Page::last(vec![2])),
            ]),
            stats: Arc::clone(&stats),
            seen: Mutex::new(Vec::new()),
        };
        let config = ScanConfig::builder("t", Arc::new(reader))
            .backoff(BackoffConfig {
                min: Duration::from_millis(1),
                max: Duration::from_millis(8),
                jitter: false,
                ..BackoffConfig::default()
            })
            .build()
            .unwrap();

        let handler = |_: Vec<u32>| {};
        let outcome = scan_segment(0, &config, &handler, &CancelSignal::new(), &stats);
        assert_eq!(outcome, SegmentOutcome::Exhausted);

        // Delay slept before each read: none, 1ms, ~2ms, none new, 1ms again
        let seen = config.client.seen.lock().clone();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[1], Duration::from_millis(1));
        assert!(seen[2] > Duration::from_millis(1), "{:?}", seen[2]);
        assert_eq!(seen[4], Duration::from_millis(1));
        assert_eq!(stats.failures.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let reader = ScriptedReader::new(vec![Ok(Page::last(vec![1]))]);
        let config = config(reader, RetryPolicy::Forever);
        let cancel = CancelSignal::new();
        cancel.cancel();

        let handler = |_: Vec<u32>| panic!("handler must not run");
        let stats = SegmentStats::new(0);
        let outcome = scan_segment(0, &config, &handler, &cancel, &stats);

        assert_eq!(outcome, SegmentOutcome::Cancelled);
        assert!(config.client.cursors().is_empty());
    }

    #[test]
    fn test_phase_roundtrip() {
        let stats = SegmentStats::new(3);
        assert_eq!(stats.phase(), SegmentPhase::Init);
        stats.set_phase(SegmentPhase::Backoff);
        assert_eq!(stats.phase(), SegmentPhase::Backoff);

        stats.finish(SegmentOutcome::Exhausted);
        stats.finish(SegmentOutcome::Panicked);
        assert_eq!(stats.phase(), SegmentPhase::Done);
        assert_eq!(stats.outcome(), Some(SegmentOutcome::Exhausted));
        assert_eq!(stats.report().segment, 3);
    }
}
