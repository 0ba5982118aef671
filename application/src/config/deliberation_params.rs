//! Deliberation parameters: orchestrator loop control.
//!
//! [`DeliberationParams`] groups the static parameters that bound a session
//! in [`DeliberationOrchestrator`](crate::use_cases::deliberate::DeliberationOrchestrator).

use delib_domain::ConsensusThresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationParams {
    /// Maximum number of rounds per session.
    pub max_rounds: usize,
    /// Wall-clock budget, checked before each new round.
    pub timeout: Duration,
    /// Characters of each prior response shown in the next round's prompt.
    pub digest_chars: usize,
    /// Consensus engine thresholds (convergence, strength, dissent).
    pub thresholds: ConsensusThresholds,
}

impl Default for DeliberationParams {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            timeout: Duration::from_secs(300),
            digest_chars: 200,
            thresholds: ConsensusThresholds::default(),
        }
    }
}

impl DeliberationParams {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_digest_chars(mut self, chars: usize) -> Self {
        self.digest_chars = chars;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.thresholds.convergence = threshold;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ConsensusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = DeliberationParams::default();
        assert_eq!(params.max_rounds, 5);
        assert_eq!(params.timeout, Duration::from_secs(300));
        assert_eq!(params.digest_chars, 200);
        assert_eq!(params.thresholds.convergence, 0.85);
    }

    #[test]
    fn test_builder() {
        let params = DeliberationParams::default()
            .with_max_rounds(3)
            .with_timeout(Duration::from_secs(60))
            .with_convergence_threshold(0.9);

        assert_eq!(params.max_rounds, 3);
        assert_eq!(params.timeout, Duration::from_secs(60));
        assert_eq!(params.thresholds.convergence, 0.9);
    }
}
