//! Runtime configuration of the session layer.

use std::time::Duration;

use crate::domain::RateLimitPolicy;

/// Default interval between heartbeat re-validations
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default time a connection may stay silent after a liveness probe
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    pub liveness_timeout: Duration,
    pub rate_limit: RateLimitPolicy,
    /// Shared secret required on the internal endpoints (`x-internal-token`)
    pub internal_token: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            rate_limit: RateLimitPolicy::default(),
            internal_token: None,
        }
    }
}

impl SessionConfig {
    pub fn liveness_timeout_millis(&self) -> i64 {
        i64::try_from(self.liveness_timeout.as_millis()).unwrap_or(i64::MAX)
    }
}
