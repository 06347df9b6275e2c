//! Error types for table-scanner
//!
//! This module defines the error hierarchy for:
//! - Storage (page read) errors reported by a [`SegmentReader`]
//! - Configuration errors
//! - Worker thread errors
//!
//! Storage errors never leave a segment worker. They are logged and retried
//! according to the scan's retry policy; the orchestrator only ever sees the
//! resulting [`SegmentOutcome`](crate::scanner::SegmentOutcome).
//!
//! [`SegmentReader`]: crate::storage::SegmentReader

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for table-scanner
#[derive(Error, Debug)]
pub enum ScanError {
    /// Storage errors (only surfaced outside a scan, e.g. opening a table)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by a single page read
#[derive(Error, Debug)]
pub enum StorageError {
    /// The service asked us to slow down
    #[error("Request throttled: {message}")]
    Throttled { message: String },

    /// Network failure or service-side transient fault
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Table does not exist
    #[error("Table not found: '{table}'")]
    TableNotFound { table: String },

    /// Request rejected as malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error while reading a table source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be decoded
    #[error("Failed to decode record at line {line}: {reason}")]
    Decode { line: usize, reason: String },
}

impl StorageError {
    /// Check if the service signalled throttling
    pub fn is_throttle(&self) -> bool {
        matches!(self, StorageError::Throttled { .. })
    }

    /// Check if the error is expected to clear up on its own
    ///
    /// Purely informational: the scan retries every error the same way.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Throttled { .. } | StorageError::Unavailable(_) | StorageError::Io(_)
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Table name missing
    #[error("Table name must not be empty")]
    EmptyTableName,

    /// Owned segments fall outside the table's segment range
    #[error(
        "Segment {segment} is out of range: table has {total_segments} segments \
         (segment_count={segment_count}, segment_offset={segment_offset})"
    )]
    SegmentOutOfRange {
        segment: u64,
        total_segments: u32,
        segment_count: u32,
        segment_offset: u32,
    },

    /// Page size limit of zero
    #[error("Page size limit must be at least 1")]
    InvalidLimit,

    /// Backoff bounds inverted or growth factor too small
    #[error("Invalid backoff: {reason}")]
    InvalidBackoff { reason: String },

    /// Table file could not be used
    #[error("Invalid table path '{path}': {reason}")]
    InvalidTablePath { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be spawned
    #[error("Failed to spawn worker for segment {segment}: {reason}")]
    SpawnFailed { segment: u32, reason: String },
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for StorageError
pub type StorageResult<T> = std::result::Result<T, StorageError>;
