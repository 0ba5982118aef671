//! Conversion of a finished session into proof material.

use super::entities::{ConsensusResult, DeliberationRound, ModelVote};
use crate::consensus::{Consensus, Decision, StanceClassifier};
use crate::core::string::truncate_chars;
use crate::deliberation::{DeliberationContext, DeliberationSession, Round};

/// Maximum characters of response text kept as vote reasoning
pub const REASONING_CHARS: usize = 500;

/// Rounds and verdict of a session, ready to become a proof
#[derive(Debug, Clone, PartialEq)]
pub struct ProofDraft {
    pub delib_id: String,
    pub question: String,
    pub context: DeliberationContext,
    pub rounds: Vec<DeliberationRound>,
    pub consensus: ConsensusResult,
}

impl ProofDraft {
    /// Build a draft from a session and its final verdict.
    ///
    /// Each response becomes a vote whose position is the classifier's
    /// stance and whose confidence is the round's agreement score.
    pub fn from_session(
        session: &DeliberationSession,
        consensus: &Consensus,
        classifier: &StanceClassifier,
    ) -> Self {
        Self {
            delib_id: session.id.clone(),
            question: session.question.content().to_string(),
            context: session.context.clone(),
            rounds: session
                .rounds()
                .iter()
                .map(|r| record_round(r, classifier))
                .collect(),
            consensus: ConsensusResult::from(consensus),
        }
    }
}

fn record_round(round: &Round, classifier: &StanceClassifier) -> DeliberationRound {
    let votes = round
        .responses
        .iter()
        .map(|r| ModelVote {
            participant_id: r.participant_id.clone(),
            model: r.model.clone(),
            position: classifier.classify(&r.content).position().to_string(),
            confidence: round.agreement_score,
            reasoning: truncate_chars(&r.content, REASONING_CHARS),
            timestamp: r.timestamp,
        })
        .collect();

    let convergence_metrics = match serde_json::to_value(&round.metrics) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    DeliberationRound {
        round_number: round.number,
        votes,
        agreement_score: round.agreement_score,
        convergence_metrics,
        duration_seconds: round.duration_seconds(),
    }
}

impl From<&Consensus> for ConsensusResult {
    /// Supporting participants share the decided stance, dissenting ones hold
    /// the opposite stance. Undecided verdicts have neither.
    fn from(c: &Consensus) -> Self {
        let (supporting, dissenting) = match c.decision {
            Decision::Approved => (c.voting.approve.clone(), c.voting.reject.clone()),
            Decision::Rejected => (c.voting.reject.clone(), c.voting.approve.clone()),
            Decision::Undecided | Decision::Timeout => (Vec::new(), Vec::new()),
        };
        let rationale = match &c.dissent {
            Some(dissent) => format!("{} {}.", c.summary, dissent),
            None => c.summary.clone(),
        };

        Self {
            reached: c.reached,
            strength: c.strength,
            agreement_score: c.agreement_score,
            final_decision: c.decision.as_str().to_string(),
            supporting_participants: supporting,
            dissenting_participants: dissenting,
            rationale,
        }
    }
}
