//! Reconnection decisions.
//!
//! Pure functions over [`ClientError`] and the attempt count, so the backoff
//! schedule can be tested without a server.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff with a bounded number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            max_delay: DEFAULT_RECONNECT_MAX_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the `attempt`-th retry (1-based), doubling each time up to `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether the `attempt`-th retry (1-based) should happen after `error`
    pub fn should_retry(&self, error: &ClientError, attempt: u32) -> bool {
        !error.needs_reauthentication() && attempt <= self.max_attempts
    }

    /// Delay before the next retry, or `None` when the client should give up
    pub fn next_delay(&self, error: &ClientError, attempt: u32) -> Option<Duration> {
        self.should_retry(error, attempt)
            .then(|| self.delay_for(attempt))
    }
}
