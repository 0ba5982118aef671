//! Model router configuration from TOML (`[router]` section)

use super::ConfigIssue;
use crate::providers::DEFAULT_REQUEST_TIMEOUT;
use delib_application::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw `[router]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRouterConfig {
    /// Attempts per participant query, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each further retry
    pub backoff_base_ms: u64,
    /// HTTP timeout for a single provider request
    pub request_timeout_secs: u64,
}

impl Default for FileRouterConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_base_ms: policy.base_delay.as_millis() as u64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl FileRouterConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.max_attempts == 0 {
            issues.push(ConfigIssue::warning(
                "router.max_attempts",
                "max_attempts is 0; each query will still be attempted once",
            ));
        }
        if self.request_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                "router.request_timeout_secs",
                "request_timeout_secs cannot be 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = FileRouterConfig::default();
        assert_eq!(config.to_retry_policy(), RetryPolicy::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_attempts_is_clamped_with_warning() {
        let config = FileRouterConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.to_retry_policy().max_attempts, 1);

        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "router.max_attempts");
    }
}
