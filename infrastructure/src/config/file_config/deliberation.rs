//! Deliberation loop configuration from TOML (`[deliberation]` section)

use super::{ConfigIssue, check_unit};
use delib_application::DeliberationParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw `[deliberation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    /// Maximum number of rounds per session
    pub max_rounds: usize,
    /// Wall-clock budget in seconds
    pub timeout_secs: u64,
    /// Agreement score that ends a session early
    pub convergence_threshold: f64,
    /// Characters of each prior response quoted in the next round
    pub digest_chars: usize,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        let params = DeliberationParams::default();
        Self {
            max_rounds: params.max_rounds,
            timeout_secs: params.timeout.as_secs(),
            convergence_threshold: params.thresholds.convergence,
            digest_chars: params.digest_chars,
        }
    }
}

impl FileDeliberationConfig {
    pub fn to_params(&self) -> DeliberationParams {
        DeliberationParams::default()
            .with_max_rounds(self.max_rounds)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_convergence_threshold(self.convergence_threshold)
            .with_digest_chars(self.digest_chars)
    }

    pub(super) fn validate(&self, issues: &mut Vec<ConfigIssue>) {
        if self.max_rounds == 0 {
            issues.push(ConfigIssue::error(
                "deliberation.max_rounds",
                "max_rounds must be at least 1",
            ));
        }
        if self.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                "deliberation.timeout_secs",
                "timeout_secs cannot be 0",
            ));
        }
        check_unit(
            issues,
            "deliberation.convergence_threshold",
            self.convergence_threshold,
        );
    }
}
