//! Segmented parallel scanner
//!
//! This module implements the scan engine: one worker thread per owned
//! segment, each paging through its segment and handing pages to a shared
//! handler, with backoff and retry on failed reads.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────────┐
//!                     │         Scanner          │
//!                     │  - segment indices       │
//!                     │  - completion tracker    │
//!                     │  - cancellation signal   │
//!                     └────────────┬─────────────┘
//!                                  │ start()
//!       ┌──────────────────────────┼──────────────────────────┐
//!       │                          │                          │
//! ┌─────▼──────┐             ┌─────▼──────┐             ┌─────▼──────┐
//! │ Segment k  │             │ Segment k+1│             │ Segment k+n│
//! │ cursor     │             │ cursor     │             │ cursor     │
//! │ backoff    │             │ backoff    │             │ backoff    │
//! └─────┬──────┘             └─────┬──────┘             └─────┬──────┘
//!       │ read_page                │                          │
//!       ▼                          ▼                          ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                   SegmentReader (shared client)                     │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `k = segment_count * segment_offset`, `n = segment_count - 1`.

pub mod backoff;
pub mod cancel;
pub mod coordinator;
pub mod handler;
pub mod retry;
mod tracker;
pub mod worker;

pub use backoff::{Backoff, BackoffConfig};
pub use cancel::CancelSignal;
pub use coordinator::{ScanProgress, ScanSummary, Scanner};
pub use handler::ItemHandler;
pub use retry::RetryPolicy;
pub use worker::{SegmentOutcome, SegmentPhase, SegmentReport, SegmentStats};
