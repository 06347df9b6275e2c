//! table-scanner - Parallel Segmented Table Scanner
//!
//! Reads every record of a partitioned remote table by splitting the table
//! into segments and scanning each segment on its own worker thread. Pages
//! are handed to a caller-supplied handler as they arrive.
//!
//! # Features
//!
//! - **Segmented Parallelism**: One worker thread per segment. Several
//!   processes can share a table by owning different blocks of segments
//!   (`segment_count * segment_offset + i`).
//!
//! - **Resilient Pagination**: Failed reads are retried with exponential
//!   backoff and jitter (capped, 5 minutes by default) using the same
//!   continuation cursor, so a failure never skips or repeats a page.
//!
//! - **Blocking Hand-off**: A segment does not read its next page until the
//!   handler has returned, so handler latency is the backpressure.
//!
//! - **Opt-in Limits**: Retries are unbounded by default; a retry policy and
//!   a cancellation signal let callers stop stuck segments.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Remote table service                       │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ read_page(segment, cursor, limit)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Segment Workers                            │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐      │
//! │  │  Seg 0  │  │  Seg 1  │  │  Seg 2  │  ...    │  Seg N  │      │
//! │  │ backoff │  │ backoff │  │ backoff │         │ backoff │      │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘      │
//! │       │            │            │                    │          │
//! │       ▼            ▼            ▼                    ▼          │
//! │            ┌──────────────────────────┐                         │
//! │            │     ItemHandler          │                         │
//! │            │  (called per page,       │                         │
//! │            │   on the worker thread)  │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use table_scanner::{MemoryTable, ScanConfig, Scanner};
//!
//! let table = MemoryTable::new("events", (0..1000).collect::<Vec<u64>>());
//! let config = ScanConfig::builder("events", Arc::new(table))
//!     .segment_count(4)
//!     .limit(100)
//!     .build()
//!     .unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//!
//! let scanner = Scanner::new(config);
//! scanner
//!     .start(move |items: Vec<u64>| {
//!         counter.fetch_add(items.len(), Ordering::Relaxed);
//!     })
//!     .unwrap();
//!
//! let summary = scanner.wait();
//! assert!(summary.is_complete());
//! assert_eq!(seen.load(Ordering::Relaxed), 1000);
//! ```

pub mod config;
pub mod error;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use config::{CliArgs, ScanConfig, ScanConfigBuilder};
pub use error::{ConfigError, Result, ScanError, StorageError, WorkerError};
pub use scanner::{
    BackoffConfig, CancelSignal, ItemHandler, RetryPolicy, ScanProgress, ScanSummary, Scanner,
    SegmentOutcome,
};
pub use storage::{JsonLinesTable, MemoryTable, Page, PageRequest, SegmentReader};
