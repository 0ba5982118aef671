//! Vote classification for deliberation rounds
//!
//! Each response is bucketed independently into a [`Stance`]; the buckets
//! are collected into a [`VoteTally`] which decides the outcome.

use super::agreement::Vocabulary;
use crate::core::string::word_tokens;
use crate::deliberation::ModelResponse;
use serde::{Deserialize, Serialize};

/// A participant's stance as read from its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Approve,
    Reject,
    Abstain,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Approve => "approve",
            Stance::Reject => "reject",
            Stance::Abstain => "abstain",
        }
    }

    /// Upper-case position label used in proof records
    pub fn position(&self) -> &'static str {
        match self {
            Stance::Approve => "APPROVE",
            Stance::Reject => "REJECT",
            Stance::Abstain => "ABSTAIN",
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reads a stance out of free-form response text.
///
/// Counts approve-vocabulary and reject-vocabulary matches; the larger side
/// wins and ties (including no matches) are an abstention.
#[derive(Debug, Clone)]
pub struct StanceClassifier {
    approve: Vocabulary,
    reject: Vocabulary,
}

impl StanceClassifier {
    pub fn new(approve: Vocabulary, reject: Vocabulary) -> Self {
        Self { approve, reject }
    }

    pub fn classify(&self, text: &str) -> Stance {
        let tokens = word_tokens(text);
        let approve = self.approve.count_matches(&tokens);
        let reject = self.reject.count_matches(&tokens);

        match approve.cmp(&reject) {
            std::cmp::Ordering::Greater => Stance::Approve,
            std::cmp::Ordering::Less => Stance::Reject,
            std::cmp::Ordering::Equal => Stance::Abstain,
        }
    }

    /// Classify every response into a tally, preserving response order
    pub fn tally(&self, responses: &[ModelResponse]) -> VoteTally {
        let mut tally = VoteTally::default();
        for response in responses {
            tally.record(&response.participant_id, self.classify(&response.content));
        }
        tally
    }
}

impl Default for StanceClassifier {
    fn default() -> Self {
        Self::new(
            Vocabulary::new(["approve", "approved", "yes", "should implement", "support"]),
            Vocabulary::new(["reject", "rejected", "no", "should not", "oppose"]),
        )
    }
}

/// Participant ids grouped by stance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub approve: Vec<String>,
    pub reject: Vec<String>,
    pub abstain: Vec<String>,
}

impl VoteTally {
    pub fn record(&mut self, participant: impl Into<String>, stance: Stance) {
        let bucket = match stance {
            Stance::Approve => &mut self.approve,
            Stance::Reject => &mut self.reject,
            Stance::Abstain => &mut self.abstain,
        };
        bucket.push(participant.into());
    }

    pub fn total(&self) -> usize {
        self.approve.len() + self.reject.len() + self.abstain.len()
    }

    /// Stance recorded for a participant, if any
    pub fn stance_of(&self, participant: &str) -> Option<Stance> {
        if self.approve.iter().any(|p| p == participant) {
            Some(Stance::Approve)
        } else if self.reject.iter().any(|p| p == participant) {
            Some(Stance::Reject)
        } else if self.abstain.iter().any(|p| p == participant) {
            Some(Stance::Abstain)
        } else {
            None
        }
    }

    /// Whether every recorded vote shares one stance
    pub fn is_unanimous(&self) -> bool {
        let total = self.total();
        total > 0
            && (self.approve.len() == total
                || self.reject.len() == total
                || self.abstain.len() == total)
    }

    /// Visual summary, e.g. "[●●○·]" (approve, reject, abstain)
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        summary.extend(std::iter::repeat_n('●', self.approve.len()));
        summary.extend(std::iter::repeat_n('○', self.reject.len()));
        summary.extend(std::iter::repeat_n('·', self.abstain.len()));
        summary.push(']');
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_stances() {
        let classifier = StanceClassifier::default();
        assert_eq!(classifier.classify("APPROVE - I support this."), Stance::Approve);
        assert_eq!(classifier.classify("We should not do this. Reject."), Stance::Reject);
        assert_eq!(classifier.classify("More information needed."), Stance::Abstain);
    }

    #[test]
    fn test_tie_is_abstain() {
        let classifier = StanceClassifier::default();
        assert_eq!(classifier.classify("approve? reject?"), Stance::Abstain);
    }

    #[test]
    fn test_tally_preserves_order() {
        let classifier = StanceClassifier::default();
        let responses = vec![
            ModelResponse::new("claude", "m", "Approve."),
            ModelResponse::new("gpt4", "m", "Reject."),
            ModelResponse::new("gemini", "m", "Unsure."),
            ModelResponse::new("deepseek", "m", "Yes, approve."),
        ];
        let tally = classifier.tally(&responses);

        assert_eq!(tally.approve, vec!["claude", "deepseek"]);
        assert_eq!(tally.reject, vec!["gpt4"]);
        assert_eq!(tally.abstain, vec!["gemini"]);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.stance_of("gemini"), Some(Stance::Abstain));
        assert_eq!(tally.stance_of("mistral"), None);
        assert_eq!(tally.vote_summary(), "[●●○·]");
    }

    #[test]
    fn test_unanimous() {
        let mut tally = VoteTally::default();
        assert!(!tally.is_unanimous());
        tally.record("a", Stance::Approve);
        tally.record("b", Stance::Approve);
        assert!(tally.is_unanimous());
        tally.record("c", Stance::Abstain);
        assert!(!tally.is_unanimous());
    }

    #[test]
    fn test_position_labels() {
        assert_eq!(Stance::Approve.position(), "APPROVE");
        assert_eq!(Stance::Reject.to_string(), "reject");
    }
}
