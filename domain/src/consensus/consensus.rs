//! Consensus verdicts and the engine that produces them
//!
//! The engine is a set of pure functions over a round's responses:
//! agreement score, strength classification, vote tally, decision and
//! dissent note.

use super::agreement::{AgreementScorer, KeywordAgreementScorer, NEUTRAL_AGREEMENT};
use super::integrity::IntegrityScore;
use super::vote::{StanceClassifier, VoteTally};
use crate::deliberation::{ModelResponse, Round};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Coarse classification of the final agreement score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStrength {
    Strong,
    Moderate,
    Weak,
    #[serde(alias = "no_consensus")]
    None,
    Timeout,
}

impl ConsensusStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusStrength::Strong => "strong",
            ConsensusStrength::Moderate => "moderate",
            ConsensusStrength::Weak => "weak",
            ConsensusStrength::None => "none",
            ConsensusStrength::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ConsensusStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a deliberation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
    Undecided,
    Timeout,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "APPROVED",
            Decision::Rejected => "REJECTED",
            Decision::Undecided => "UNDECIDED",
            Decision::Timeout => "TIMEOUT",
        }
    }

    /// Check if the outcome is approved
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    /// Check if the outcome is rejected
    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Rejected)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final verdict of a deliberation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    /// Agreement score met the "reached" threshold, regardless of decision
    pub reached: bool,
    pub strength: ConsensusStrength,
    pub agreement_score: f64,
    pub decision: Decision,
    pub summary: String,
    pub voting: VoteTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dissent: Option<String>,
    pub confidence: f64,
    /// Externally computed integrity score, when a scorer was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<IntegrityScore>,
}

impl Consensus {
    /// Verdict for a session whose wall-clock budget ran out
    pub fn timeout(timeout_secs: u64) -> Self {
        Self {
            reached: false,
            strength: ConsensusStrength::Timeout,
            agreement_score: 0.0,
            decision: Decision::Timeout,
            summary: format!("Deliberation timeout after {}s", timeout_secs),
            voting: VoteTally::default(),
            dissent: Some("Timeout occurred before consensus".to_string()),
            confidence: 0.0,
            integrity: None,
        }
    }

    /// Verdict when no round was ever completed
    pub fn no_rounds() -> Self {
        Self {
            reached: false,
            strength: ConsensusStrength::None,
            agreement_score: 0.0,
            decision: Decision::Undecided,
            summary: "No deliberation rounds completed".to_string(),
            voting: VoteTally::default(),
            dissent: None,
            confidence: 0.0,
            integrity: None,
        }
    }

    /// Attach an integrity score. Confidence is left as the agreement score.
    pub fn with_integrity(mut self, integrity: IntegrityScore) -> Self {
        self.integrity = Some(integrity);
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.decision == Decision::Timeout
    }
}

/// Score thresholds used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusThresholds {
    pub strong: f64,
    pub moderate: f64,
    pub weak: f64,
    /// Minimum score for `reached = true`
    pub reached: f64,
    /// Minimum score that ends a session early
    pub convergence: f64,
    /// Scores below this carry a dissent note
    pub dissent: f64,
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            strong: 0.90,
            moderate: 0.75,
            weak: 0.60,
            reached: 0.75,
            convergence: 0.85,
            dissent: 0.85,
        }
    }
}

/// Pure consensus functions over round responses.
#[derive(Clone)]
pub struct ConsensusEngine {
    scorer: Arc<dyn AgreementScorer>,
    classifier: StanceClassifier,
    thresholds: ConsensusThresholds,
}

impl ConsensusEngine {
    pub fn new(scorer: Arc<dyn AgreementScorer>) -> Self {
        Self {
            scorer,
            classifier: StanceClassifier::default(),
            thresholds: ConsensusThresholds::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: StanceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ConsensusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &ConsensusThresholds {
        &self.thresholds
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Agreement score for a response set.
    ///
    /// An empty set is neutral (0.5). Scorer output is clamped to `[0, 1]`
    /// and a non-finite result is treated as neutral.
    pub fn agreement(&self, responses: &[ModelResponse]) -> f64 {
        if responses.is_empty() {
            return NEUTRAL_AGREEMENT;
        }
        let score = self.scorer.score(responses);
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            NEUTRAL_AGREEMENT
        }
    }

    pub fn strength(&self, score: f64) -> ConsensusStrength {
        let t = &self.thresholds;
        if score >= t.strong {
            ConsensusStrength::Strong
        } else if score >= t.moderate {
            ConsensusStrength::Moderate
        } else if score >= t.weak {
            ConsensusStrength::Weak
        } else {
            ConsensusStrength::None
        }
    }

    pub fn is_converged(&self, score: f64) -> bool {
        score >= self.thresholds.convergence
    }

    pub fn tally(&self, responses: &[ModelResponse]) -> VoteTally {
        self.classifier.tally(responses)
    }

    /// Majority of approve vs reject; equal counts are undecided
    pub fn decision(tally: &VoteTally) -> Decision {
        match tally.approve.len().cmp(&tally.reject.len()) {
            std::cmp::Ordering::Greater => Decision::Approved,
            std::cmp::Ordering::Less => Decision::Rejected,
            std::cmp::Ordering::Equal => Decision::Undecided,
        }
    }

    /// Final verdict from the last completed round.
    pub fn conclude(&self, last_round: Option<&Round>) -> Consensus {
        let Some(round) = last_round else {
            return Consensus::no_rounds();
        };

        let score = round.agreement_score;
        let voting = self.tally(&round.responses);
        let decision = Self::decision(&voting);
        let participants: Vec<&str> = round
            .responses
            .iter()
            .map(|r| r.participant_id.as_str())
            .collect();

        let dissent = (score < self.thresholds.dissent)
            .then(|| "Some participants expressed reservations or disagreement".to_string());

        Consensus {
            reached: score >= self.thresholds.reached,
            strength: self.strength(score),
            agreement_score: score,
            decision,
            summary: summarize(&participants, decision),
            voting,
            dissent,
            confidence: score,
            integrity: None,
        }
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(Arc::new(KeywordAgreementScorer::default()))
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("scorer", &self.scorer.name())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

fn summarize(participants: &[&str], decision: Decision) -> String {
    if participants.is_empty() {
        return "No participant responded in the final round.".to_string();
    }
    let names = participants.join(", ");
    match decision {
        Decision::Approved => format!(
            "Participants ({}) agree that the proposal should be approved.",
            names
        ),
        Decision::Rejected => format!(
            "Majority of participants ({}) recommend rejecting the proposal.",
            names
        ),
        Decision::Undecided | Decision::Timeout => format!(
            "Participants ({}) could not reach clear consensus.",
            names
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliberation::ConvergenceMetrics;

    fn round(texts: &[(&str, &str)], score: f64) -> Round {
        let responses = texts
            .iter()
            .map(|(p, t)| ModelResponse::new(*p, "m", *t))
            .collect();
        Round::new(1, responses, score, ConvergenceMetrics::default(), 0)
    }

    struct FixedScorer(f64);

    impl AgreementScorer for FixedScorer {
        fn score(&self, _responses: &[ModelResponse]) -> f64 {
            self.0
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_strength_boundaries() {
        let engine = ConsensusEngine::default();
        assert_eq!(engine.strength(0.90), ConsensusStrength::Strong);
        assert_eq!(engine.strength(0.8999), ConsensusStrength::Moderate);
        assert_eq!(engine.strength(0.75), ConsensusStrength::Moderate);
        assert_eq!(engine.strength(0.60), ConsensusStrength::Weak);
        assert_eq!(engine.strength(0.59), ConsensusStrength::None);
    }

    #[test]
    fn test_empty_round_is_neutral() {
        let engine = ConsensusEngine::new(Arc::new(FixedScorer(0.99)));
        assert_eq!(engine.agreement(&[]), NEUTRAL_AGREEMENT);
    }

    #[test]
    fn test_scorer_output_is_clamped() {
        let responses = vec![ModelResponse::new("a", "m", "x")];
        assert_eq!(
            ConsensusEngine::new(Arc::new(FixedScorer(1.7))).agreement(&responses),
            1.0
        );
        assert_eq!(
            ConsensusEngine::new(Arc::new(FixedScorer(f64::NAN))).agreement(&responses),
            NEUTRAL_AGREEMENT
        );
    }

    #[test]
    fn test_conclude_strong_approval() {
        let engine = ConsensusEngine::default();
        let r = round(
            &[
                ("claude", "I agree. APPROVE."),
                ("gpt4", "Agree, approve."),
                ("gemini", "I agree; approve it."),
            ],
            1.0,
        );
        let consensus = engine.conclude(Some(&r));

        assert!(consensus.reached);
        assert_eq!(consensus.strength, ConsensusStrength::Strong);
        assert_eq!(consensus.decision, Decision::Approved);
        assert!(consensus.dissent.is_none());
        assert_eq!(consensus.confidence, 1.0);
        assert_eq!(consensus.voting.approve.len(), 3);
    }

    #[test]
    fn test_reached_is_independent_of_decision() {
        let engine = ConsensusEngine::default();
        let r = round(&[("a", "approve"), ("b", "reject")], 0.8);
        let consensus = engine.conclude(Some(&r));

        assert!(consensus.reached);
        assert_eq!(consensus.strength, ConsensusStrength::Moderate);
        assert_eq!(consensus.decision, Decision::Undecided);
        // 0.8 < 0.85 so dissent is noted even though consensus was reached
        assert!(consensus.dissent.is_some());
    }

    #[test]
    fn test_conclude_rejection() {
        let engine = ConsensusEngine::default();
        let r = round(&[("a", "Reject."), ("b", "No, reject."), ("c", "approve")], 0.4);
        let consensus = engine.conclude(Some(&r));
        assert_eq!(consensus.decision, Decision::Rejected);
        assert!(!consensus.reached);
        assert_eq!(consensus.strength, ConsensusStrength::None);
    }

    #[test]
    fn test_conclude_without_rounds() {
        let consensus = ConsensusEngine::default().conclude(None);
        assert_eq!(consensus.decision, Decision::Undecided);
        assert!(!consensus.reached);
    }

    #[test]
    fn test_zero_zero_is_undecided() {
        assert_eq!(ConsensusEngine::decision(&VoteTally::default()), Decision::Undecided);
    }

    #[test]
    fn test_timeout_verdict() {
        let c = Consensus::timeout(300);
        assert!(c.is_timeout());
        assert!(!c.reached);
        assert_eq!(c.strength, ConsensusStrength::Timeout);
        assert_eq!(c.summary, "Deliberation timeout after 300s");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Decision::Approved).unwrap(), "\"APPROVED\"");
        assert_eq!(serde_json::to_string(&ConsensusStrength::None).unwrap(), "\"none\"");
        let legacy: ConsensusStrength = serde_json::from_str("\"no_consensus\"").unwrap();
        assert_eq!(legacy, ConsensusStrength::None);
    }
}
