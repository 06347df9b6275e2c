//! Scan coordinator - orchestrates the parallel segmented scan
//!
//! The coordinator is responsible for:
//! - Computing the global segment indices owned by this process
//! - Spawning one worker thread per segment
//! - Blocking until every worker is done
//! - Progress snapshots, cancellation and the final summary

use crate::config::ScanConfig;
use crate::error::Result;
use crate::scanner::cancel::CancelSignal;
use crate::scanner::handler::ItemHandler;
use crate::scanner::tracker::CompletionTracker;
use crate::scanner::worker::{SegmentOutcome, SegmentPhase, SegmentReport, SegmentWorker};
use crate::storage::SegmentReader;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a finished scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// Per-segment results, in spawn order
    pub segments: Vec<SegmentReport>,

    /// Time from the first `start` to the end of `wait`
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl ScanSummary {
    /// Total pages read
    pub fn total_pages(&self) -> u64 {
        self.segments.iter().map(|s| s.pages).sum()
    }

    /// Total items delivered to the handler
    pub fn total_items(&self) -> u64 {
        self.segments.iter().map(|s| s.items).sum()
    }

    /// Total failed reads
    pub fn total_failures(&self) -> u64 {
        self.segments.iter().map(|s| s.failures).sum()
    }

    /// Returns true if every segment was read to the end
    pub fn is_complete(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.outcome.as_ref().is_some_and(SegmentOutcome::is_exhausted))
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Pages read so far
    pub pages: u64,

    /// Items delivered so far
    pub items: u64,

    /// Failed reads so far
    pub failures: u64,

    /// Workers that have not finished
    pub running: usize,

    /// Workers currently sleeping after a failed read
    pub backing_off: usize,

    /// Workers spawned
    pub total_segments: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate items per second rate
    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.items as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates a parallel scan of the segments owned by this process
pub struct Scanner<C> {
    /// Configuration
    config: Arc<ScanConfig<C>>,

    /// Outstanding workers
    tracker: CompletionTracker,

    /// Cancellation signal shared with every worker
    cancel: CancelSignal,

    /// Spawned workers
    workers: Mutex<Vec<SegmentWorker>>,

    /// Time of the first `start`
    start_time: OnceLock<Instant>,
}

impl<C: SegmentReader + 'static> Scanner<C> {
    /// Create a scanner; nothing runs until [`start`](Self::start)
    pub fn new(config: ScanConfig<C>) -> Self {
        Self {
            config: Arc::new(config),
            tracker: CompletionTracker::new(),
            cancel: CancelSignal::new(),
            workers: Mutex::new(Vec::new()),
            start_time: OnceLock::new(),
        }
    }

    /// Configuration this scanner was built with
    pub fn config(&self) -> &ScanConfig<C> {
        &self.config
    }

    /// Global segment indices owned by this process
    pub fn segments(&self) -> Vec<u32> {
        self.config.segments()
    }

    /// Spawn one worker per owned segment and return immediately
    ///
    /// Every page is passed to `handler` on the thread of the segment that
    /// read it, and that segment reads nothing else until the handler
    /// returns. A slow handler therefore throttles its segment.
    ///
    /// If a worker cannot be spawned the workers already started keep
    /// running and are still covered by [`wait`](Self::wait).
    pub fn start<H>(&self, handler: H) -> Result<()>
    where
        H: ItemHandler<C::Item> + 'static,
    {
        self.start_time.get_or_init(Instant::now);
        let handler = Arc::new(handler);

        info!(
            table = %self.config.table_name,
            segments = self.config.segment_count,
            offset = self.config.segment_offset,
            total_segments = self.config.total_segments,
            "Starting segmented scan"
        );

        let mut workers = self.workers.lock();
        for local in 0..self.config.segment_count {
            let segment = self.config.segment_for(local);
            let worker = SegmentWorker::spawn(
                segment,
                Arc::clone(&self.config),
                Arc::clone(&handler),
                self.cancel.clone(),
                self.tracker.register(),
            )?;
            workers.push(worker);
        }

        info!(count = self.config.segment_count, "Segment workers spawned");
        Ok(())
    }

    /// Block until every spawned worker has finished
    ///
    /// Safe to call from several threads at once; all of them return when
    /// the last worker finishes. Without a retry limit or cancellation this
    /// never returns while a segment keeps failing.
    pub fn wait(&self) -> ScanSummary {
        self.tracker.wait();
        self.summary()
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ScanSummary> {
        if self.tracker.wait_timeout(timeout) {
            Some(self.summary())
        } else {
            None
        }
    }

    /// Ask every worker to stop
    ///
    /// Workers stop before their next read, or immediately if backing off.
    /// A read or handler call already in progress runs to completion.
    pub fn cancel(&self) {
        info!("Scan cancellation requested");
        self.cancel.cancel();
    }

    /// Handle to the cancellation signal (for signal handlers)
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Current progress
    pub fn progress(&self) -> ScanProgress {
        let workers = self.workers.lock();
        let mut progress = ScanProgress {
            pages: 0,
            items: 0,
            failures: 0,
            running: self.tracker.outstanding(),
            backing_off: 0,
            total_segments: workers.len(),
            elapsed: self.elapsed(),
        };

        for worker in workers.iter() {
            let stats = worker.stats();
            progress.pages += stats.pages.load(Ordering::Relaxed);
            progress.items += stats.items.load(Ordering::Relaxed);
            progress.failures += stats.failures.load(Ordering::Relaxed);
            if stats.phase() == SegmentPhase::Backoff {
                progress.backing_off += 1;
            }
        }

        progress
    }

    fn elapsed(&self) -> Duration {
        self.start_time
            .get()
            .map(Instant::elapsed)
            .unwrap_or_default()
    }

    /// Join finished threads and collect per-segment reports
    fn summary(&self) -> ScanSummary {
        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            if !worker.join() {
                warn!(segment = worker.segment(), "Worker thread ended by panic");
            }
        }

        let segments: Vec<SegmentReport> = workers.iter().map(|w| w.stats().report()).collect();
        let summary = ScanSummary {
            segments,
            duration: self.elapsed(),
        };

        debug!(
            pages = summary.total_pages(),
            items = summary.total_items(),
            failures = summary.total_failures(),
            "Scan finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTable;

    #[test]
    fn test_scan_progress_rates() {
        let progress = ScanProgress {
            pages: 10,
            items: 1000,
            failures: 0,
            running: 2,
            backing_off: 0,
            total_segments: 4,
            elapsed: Duration::from_secs(10),
        };

        assert!((progress.items_per_second() - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_summary_totals() {
        let report = |segment, items, outcome| SegmentReport {
            segment,
            pages: 2,
            items,
            failures: 1,
            phase: SegmentPhase::Done,
            outcome: Some(outcome),
        };

        let summary = ScanSummary {
            segments: vec![
                report(0, 13, SegmentOutcome::Exhausted),
                report(1, 5, SegmentOutcome::Cancelled),
            ],
            duration: Duration::from_secs(1),
        };

        assert_eq!(summary.total_items(), 18);
        assert_eq!(summary.total_pages(), 4);
        assert_eq!(summary.total_failures(), 2);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_wait_without_start_returns_empty() {
        let table = MemoryTable::new("t", vec![1u32]);
        let config = ScanConfig::builder("t", Arc::new(table)).build().unwrap();
        let scanner = Scanner::new(config);

        let summary = scanner.wait();
        assert!(summary.segments.is_empty());
        assert_eq!(scanner.progress().running, 0);
    }

    #[test]
    fn test_wait_timeout_accepts_max_duration() {
        let table = MemoryTable::new("t", vec![1u32]);
        let config = ScanConfig::builder("t", Arc::new(table)).build().unwrap();
        let scanner = Scanner::new(config);
        scanner.start(|_: Vec<u32>| {}).unwrap();

        let summary = scanner
            .wait_timeout(Duration::MAX)
            .expect("scan should finish");
        assert!(summary.is_complete());
        assert_eq!(summary.total_items(), 1);
    }
}
