//! Exponential backoff with jitter
//!
//! Delays come from a [`backon`] exponential iterator: the first delay is
//! `min`, each following one grows by `factor` until it reaches `max`. With
//! jitter enabled a random amount is added on top, and the result is clamped
//! to `max` so no sleep ever exceeds the ceiling.

use crate::error::ConfigError;
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::fmt;
use std::time::Duration;

/// Default delay after the first failure
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Default delay ceiling
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// Default growth factor between attempts
pub const DEFAULT_FACTOR: f32 = 2.0;

/// Backoff settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Baseline delay
    pub min: Duration,

    /// Ceiling no delay exceeds
    pub max: Duration,

    /// Multiplier applied per consecutive failure
    pub factor: f32,

    /// Add a random amount to each delay (still capped at `max`)
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
            factor: DEFAULT_FACTOR,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Check the bounds and factor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("min delay {:?} exceeds max delay {:?}", self.min, self.max),
            });
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("factor {} must be a finite number >= 1", self.factor),
            });
        }
        Ok(())
    }

    fn builder(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min)
            .with_max_delay(self.max)
            .with_factor(self.factor)
            .without_max_times();

        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Per-worker backoff state
pub struct Backoff {
    config: BackoffConfig,
    delays: ExponentialBackoff,
    attempt: u32,
}

impl Backoff {
    /// Create backoff state at baseline
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            delays: config.builder().build(),
            config,
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Return to baseline
    pub fn reset(&mut self) {
        self.delays = self.config.builder().build();
        self.attempt = 0;
    }

    /// Delay to sleep before the next retry; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        // The iterator is unbounded; `max` is only a fallback.
        self.delays
            .next()
            .unwrap_or(self.config.max)
            .min(self.config.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("config", &self.config)
            .field("attempt", &self.attempt)
            .finish()
    }
}
