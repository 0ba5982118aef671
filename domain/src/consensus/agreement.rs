//! Agreement scoring.
//!
//! The agreement score is the single number that drives convergence. It is
//! produced by an [`AgreementScorer`], which can be swapped (for example for
//! an embedding-similarity scorer) without touching the orchestrator or the
//! rest of the consensus engine.

use crate::core::string::{contains_phrase, word_tokens};
use crate::deliberation::ModelResponse;

/// Score returned when there is no signal either way.
pub const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Strategy for measuring agreement across a round's responses.
pub trait AgreementScorer: Send + Sync {
    /// Return a score in `[0.0, 1.0]` for a non-empty response set.
    ///
    /// The empty case is handled by the caller (it is always neutral).
    fn score(&self, responses: &[ModelResponse]) -> f64;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// A list of words or multi-word phrases matched on whole-word boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    terms: Vec<Vec<String>>,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| word_tokens(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Number of distinct terms occurring in the tokenized text
    pub fn count_matches(&self, tokens: &[String]) -> usize {
        self.terms
            .iter()
            .filter(|term| contains_phrase(tokens, term))
            .count()
    }

    /// Number of distinct terms occurring in at least one of the texts.
    ///
    /// Each text is matched on its own, so a phrase never spans two texts.
    pub fn count_matches_any(&self, texts: &[Vec<String>]) -> usize {
        self.terms
            .iter()
            .filter(|term| texts.iter().any(|tokens| contains_phrase(tokens, term)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Lexical baseline scorer.
///
/// Counts the distinct agreement terms and the distinct disagreement terms
/// found anywhere in the round (a term repeated by several responses counts
/// once) and returns `agree / (agree + disagree)`. With no matches at all the score is
/// [`NEUTRAL_AGREEMENT`]; a single response trivially agrees with itself
/// and scores `1.0`.
#[derive(Debug, Clone)]
pub struct KeywordAgreementScorer {
    agreement: Vocabulary,
    disagreement: Vocabulary,
}

impl KeywordAgreementScorer {
    pub fn new(agreement: Vocabulary, disagreement: Vocabulary) -> Self {
        Self {
            agreement,
            disagreement,
        }
    }

    /// Distinct `(agreement, disagreement)` terms matched across the round
    pub fn counts(&self, responses: &[ModelResponse]) -> (usize, usize) {
        let texts: Vec<Vec<String>> = responses.iter().map(|r| word_tokens(&r.content)).collect();
        (
            self.agreement.count_matches_any(&texts),
            self.disagreement.count_matches_any(&texts),
        )
    }
}

impl Default for KeywordAgreementScorer {
    fn default() -> Self {
        Self::new(
            Vocabulary::new([
                "agree",
                "yes",
                "approve",
                "approved",
                "recommend",
                "should",
                "implement",
            ]),
            Vocabulary::new([
                "disagree",
                "no",
                "reject",
                "rejected",
                "not recommend",
                "should not",
            ]),
        )
    }
}

impl AgreementScorer for KeywordAgreementScorer {
    fn score(&self, responses: &[ModelResponse]) -> f64 {
        if responses.len() < 2 {
            return 1.0;
        }

        let (agree, disagree) = self.counts(responses);
        let total = agree + disagree;
        if total == 0 {
            return NEUTRAL_AGREEMENT;
        }
        agree as f64 / total as f64
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
