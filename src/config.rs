//! Configuration types for table-scanner
//!
//! This module defines:
//! - [`ScanConfig`], the immutable configuration a [`Scanner`](crate::Scanner)
//!   is built from, and its builder (defaults are applied once in `build`)
//! - CLI argument parsing using clap derive macros

use crate::error::ConfigError;
use crate::scanner::{BackoffConfig, RetryPolicy};
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Scan a JSON Lines table in parallel segments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "table-scanner",
    version,
    about = "Scan a partitioned table in parallel segments",
    long_about = "Reads every record of a table by splitting it into segments and scanning \
                  each segment on its own worker thread.\n\n\
                  Several processes can cooperate on one table: give each the same \
                  --total-segments and a different --offset.",
    after_help = "EXAMPLES:\n    \
        table-scanner users.jsonl\n    \
        table-scanner users.jsonl -s 8 -l 500\n    \
        table-scanner users.jsonl -s 4 --offset 1 --total-segments 8  # second of two processes"
)]
pub struct CliArgs {
    /// Table file (.jsonl, one JSON document per line); the table name is the file stem
    #[arg(value_name = "TABLE_FILE")]
    pub table: PathBuf,

    /// Number of segments this process scans
    #[arg(short = 's', long, default_value_t = 1, value_name = "NUM")]
    pub segments: u32,

    /// Which block of segments this process owns
    #[arg(long, default_value_t = 0, value_name = "NUM")]
    pub offset: u32,

    /// Total segments across all cooperating processes (default: --segments)
    #[arg(short = 't', long, value_name = "NUM")]
    pub total_segments: Option<u32>,

    /// Maximum records per page
    #[arg(short = 'l', long, value_name = "NUM")]
    pub limit: Option<u32>,

    /// Give up on a segment after this many consecutive failed reads (default: never)
    #[arg(long, value_name = "NUM")]
    pub max_retries: Option<u32>,

    /// Ceiling for the delay between retries
    #[arg(long, default_value_t = 300, value_name = "SECS")]
    pub max_backoff_secs: u64,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Quiet mode - suppress the summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-page debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Check that the table file exists and is a file
    pub fn validate_table_path(&self) -> Result<(), ConfigError> {
        if !self.table.is_file() {
            return Err(ConfigError::InvalidTablePath {
                path: self.table.clone(),
                reason: "not a readable file".to_string(),
            });
        }
        Ok(())
    }

    /// Build a scan configuration for `client` from the CLI arguments
    pub fn scan_config<C>(
        &self,
        table_name: impl Into<String>,
        client: Arc<C>,
    ) -> Result<ScanConfig<C>, ConfigError> {
        let retry = match self.max_retries {
            Some(max) => RetryPolicy::MaxAttempts(max),
            None => RetryPolicy::Forever,
        };

        let backoff = BackoffConfig {
            max: Duration::from_secs(self.max_backoff_secs),
            ..BackoffConfig::default()
        };

        let mut builder = ScanConfig::builder(table_name, client)
            .segment_count(self.segments)
            .segment_offset(self.offset)
            .retry(retry)
            .backoff(backoff);

        if let Some(total) = self.total_segments {
            builder = builder.total_segments(total);
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }

        builder.build()
    }
}

/// Validated scan configuration
pub struct ScanConfig<C> {
    /// Table to scan
    pub table_name: String,

    /// Storage client shared by all segment workers
    pub client: Arc<C>,

    /// Segments owned by this process
    pub segment_count: u32,

    /// Block of segments owned by this process
    pub segment_offset: u32,

    /// Segments the table is divided into across all processes
    pub total_segments: u32,

    /// Page size limit (`None` = service default)
    pub limit: Option<u32>,

    /// When a failing segment gives up
    pub retry: RetryPolicy,

    /// Delay between retries
    pub backoff: BackoffConfig,
}

impl<C> ScanConfig<C> {
    /// Start building a configuration
    pub fn builder(table_name: impl Into<String>, client: Arc<C>) -> ScanConfigBuilder<C> {
        ScanConfigBuilder {
            table_name: table_name.into(),
            client,
            segment_count: None,
            segment_offset: None,
            total_segments: None,
            limit: None,
            retry: RetryPolicy::default(),
            backoff: BackoffConfig::default(),
        }
    }

    /// Global index of local worker `local`
    pub fn segment_for(&self, local: u32) -> u32 {
        self.segment_count * self.segment_offset + local
    }

    /// Global segment indices owned by this process
    pub fn segments(&self) -> Vec<u32> {
        (0..self.segment_count).map(|i| self.segment_for(i)).collect()
    }
}

impl<C> Clone for ScanConfig<C> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            client: Arc::clone(&self.client),
            segment_count: self.segment_count,
            segment_offset: self.segment_offset,
            total_segments: self.total_segments,
            limit: self.limit,
            retry: self.retry,
            backoff: self.backoff,
        }
    }
}

impl<C> fmt::Debug for ScanConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("table_name", &self.table_name)
            .field("segment_count", &self.segment_count)
            .field("segment_offset", &self.segment_offset)
            .field("total_segments", &self.total_segments)
            .field("limit", &self.limit)
            .field("retry", &self.retry)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScanConfig`]
pub struct ScanConfigBuilder<C> {
    table_name: String,
    client: Arc<C>,
    segment_count: Option<u32>,
    segment_offset: Option<u32>,
    total_segments: Option<u32>,
    limit: Option<u32>,
    retry: RetryPolicy,
    backoff: BackoffConfig,
}

impl<C> ScanConfigBuilder<C> {
    /// Segments owned by this process (0 = unset, default 1)
    pub fn segment_count(mut self, count: u32) -> Self {
        self.segment_count = Some(count);
        self
    }

    /// Block of segments owned by this process (default 0)
    pub fn segment_offset(mut self, offset: u32) -> Self {
        self.segment_offset = Some(offset);
        self
    }

    /// Segments across all processes (0 = unset, default `segment_count`)
    pub fn total_segments(mut self, total: u32) -> Self {
        self.total_segments = Some(total);
        self
    }

    /// Maximum items per page
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Retry policy for failing reads (default: forever)
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Backoff settings (default: 100ms doubling to 5 minutes, with jitter)
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Apply defaults and validate
    pub fn build(self) -> Result<ScanConfig<C>, ConfigError> {
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::EmptyTableName);
        }

        let segment_count = self.segment_count.filter(|&c| c > 0).unwrap_or(1);
        let segment_offset = self.segment_offset.unwrap_or(0);
        let total_segments = self.total_segments.filter(|&t| t > 0).unwrap_or(segment_count);

        let highest = segment_count as u64 * segment_offset as u64 + segment_count as u64 - 1;
        if highest >= total_segments as u64 {
            return Err(ConfigError::SegmentOutOfRange {
                segment: highest,
                total_segments,
                segment_count,
                segment_offset,
            });
        }

        if self.limit == Some(0) {
            return Err(ConfigError::InvalidLimit);
        }

        self.backoff.validate()?;

        Ok(ScanConfig {
            table_name: self.table_name,
            client: self.client,
            segment_count,
            segment_offset,
            total_segments,
            limit: self.limit,
            retry: self.retry,
            backoff: self.backoff,
        })
    }
}
