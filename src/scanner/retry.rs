//! Retry policy for failed page reads

use std::time::Duration;

/// How long a segment keeps retrying a failing page read
///
/// Counts and durations apply to the current failure streak; any successful
/// read starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry until the read succeeds
    #[default]
    Forever,

    /// Give up after this many consecutive failures
    MaxAttempts(u32),

    /// Give up once a failure streak has lasted this long
    MaxElapsed(Duration),
}

impl RetryPolicy {
    /// Check whether another retry is allowed
    ///
    /// `failures` is the number of consecutive failed reads so far (at least
    /// 1 when called), `streak` the time since the first of them.
    pub fn should_retry(&self, failures: u32, streak: Duration) -> bool {
        match *self {
            RetryPolicy::Forever => true,
            RetryPolicy::MaxAttempts(max) => failures < max,
            RetryPolicy::MaxElapsed(max) => streak < max,
        }
    }

    /// Returns true if this policy never gives up
    pub fn is_unbounded(&self) -> bool {
        matches!(self, RetryPolicy::Forever)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forever() {
        let policy = RetryPolicy::default();
        assert!(policy.is_unbounded());
        assert!(policy.should_retry(u32::MAX, Duration::from_secs(86_400)));
    }

    #[test]
    fn test_max_attempts() {
        let policy = RetryPolicy::MaxAttempts(3);
        assert!(policy.should_retry(1, Duration::ZERO));
        assert!(policy.should_retry(2, Duration::ZERO));
        assert!(!policy.should_retry(3, Duration::ZERO));
    }

    #[test]
    fn test_max_elapsed() {
        let policy = RetryPolicy::MaxElapsed(Duration::from_secs(10));
        assert!(policy.should_retry(50, Duration::from_secs(9)));
        assert!(!policy.should_retry(1, Duration::from_secs(10)));
    }
}
