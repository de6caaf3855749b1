//! Retry policy for the registry connectivity probe

use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(300);

/// Retry configuration for the probe. Does not apply to persistence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Statuses worth another attempt
    pub retry_predicate: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
            retry_predicate: is_server_error,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            ..Self::default()
        }
    }

    /// Single attempt, fail fast
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_predicate(mut self, predicate: fn(u16) -> bool) -> Self {
        self.retry_predicate = predicate;
        self
    }

    pub fn should_retry(&self, status: u16) -> bool {
        (self.retry_predicate)(status)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Default predicate: only server-side failures are retried
pub fn is_server_error(status: u16) -> bool {
    status >= 500
}
