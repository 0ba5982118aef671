//! A single deliberation round as held in live session state.

use super::response::ModelResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convergence measurements for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    /// Participants the round was sent to
    pub expected: usize,
    /// Participants that answered
    pub responded: usize,
    /// Change in agreement score relative to the previous round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f64>,
    pub approve: usize,
    pub reject: usize,
    pub abstain: usize,
}

impl ConvergenceMetrics {
    /// Fraction of expected participants that answered (0.0 when none expected)
    pub fn response_rate(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.responded as f64 / self.expected as f64
        }
    }
}

/// One synchronized batch of participant queries plus its agreement score.
///
/// Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-indexed)
    pub number: usize,
    /// Responses in session participant order; failed participants are absent
    pub responses: Vec<ModelResponse>,
    pub agreement_score: f64,
    pub metrics: ConvergenceMetrics,
    /// Wall-clock duration of the round in milliseconds
    pub duration_ms: u64,
    /// When the round completed
    pub completed_at: DateTime<Utc>,
}

impl Round {
    pub fn new(
        number: usize,
        responses: Vec<ModelResponse>,
        agreement_score: f64,
        metrics: ConvergenceMetrics,
        duration_ms: u64,
    ) -> Self {
        Self {
            number,
            responses,
            agreement_score,
            metrics,
            duration_ms,
            completed_at: Utc::now(),
        }
    }

    /// Whether no participant answered this round
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    pub fn total_tokens(&self) -> u64 {
        self.responses.iter().map(|r| r.tokens as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_accessors() {
        let responses = vec![
            ModelResponse::new("claude", "claude-sonnet-4-5", "I agree").with_tokens(120),
            ModelResponse::new("gpt4", "gpt-4-turbo", "Approve").with_tokens(80),
        ];
        let metrics = ConvergenceMetrics {
            expected: 3,
            responded: 2,
            ..Default::default()
        };
        let round = Round::new(1, responses, 1.0, metrics, 2300);

        assert!(!round.is_empty());
        assert_eq!(round.total_tokens(), 200);
        assert_eq!(round.duration_seconds(), 2.3);
        assert!((round.metrics.response_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_metrics_rate() {
        assert_eq!(ConvergenceMetrics::default().response_rate(), 0.0);
    }
}
