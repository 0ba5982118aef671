//! Deliberation session entity and its lifecycle.
//!
//! ```text
//! Created ──► RoundRunning ──┬──► Converged ────────┐
//!                 ▲   │      ├──► MaxRoundsReached ─┼──► Finalized
//!                 └───┘      └──► TimedOut ─────────┘
//! ```

use super::round::Round;
use crate::consensus::Consensus;
use crate::core::error::DomainError;
use crate::core::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Free-form background context handed to participants.
pub type DeliberationContext = serde_json::Map<String, serde_json::Value>;

/// Why a session stopped running rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A round's agreement score reached the convergence threshold
    Converged,
    /// The round limit was exhausted without convergence
    MaxRoundsReached,
    /// The wall-clock timeout elapsed before a new round could start
    TimedOut,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    RoundRunning,
    Converged,
    MaxRoundsReached,
    TimedOut,
    Finalized,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::RoundRunning => "round_running",
            SessionState::Converged => "converged",
            SessionState::MaxRoundsReached => "max_rounds_reached",
            SessionState::TimedOut => "timed_out",
            SessionState::Finalized => "finalized",
        }
    }

    /// Whether the session has stopped running rounds
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Created | SessionState::RoundRunning)
    }
}

impl From<Termination> for SessionState {
    fn from(t: Termination) -> Self {
        match t {
            Termination::Converged => SessionState::Converged,
            Termination::MaxRoundsReached => SessionState::MaxRoundsReached,
            Termination::TimedOut => SessionState::TimedOut,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one deliberation, from creation to its final verdict.
#[derive(Debug, Clone)]
pub struct DeliberationSession {
    pub id: String,
    pub question: Question,
    /// Participant ids, in the order responses are reported
    pub participants: Vec<String>,
    pub context: DeliberationContext,
    pub max_rounds: usize,
    pub timeout: Duration,
    pub started_at: DateTime<Utc>,
    current_round: usize,
    rounds: Vec<Round>,
    state: SessionState,
    termination: Option<Termination>,
    consensus: Option<Consensus>,
}

impl DeliberationSession {
    pub fn new(
        id: impl Into<String>,
        question: Question,
        participants: Vec<String>,
        context: DeliberationContext,
        max_rounds: usize,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        if participants.is_empty() {
            return Err(DomainError::NoParticipants);
        }
        Ok(Self {
            id: id.into(),
            question,
            participants,
            context,
            max_rounds,
            timeout,
            started_at: Utc::now(),
            current_round: 0,
            rounds: Vec::new(),
            state: SessionState::Created,
            termination: None,
            consensus: None,
        })
    }

    /// Number of completed rounds; never exceeds `max_rounds`
    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn last_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn consensus(&self) -> Option<&Consensus> {
        self.consensus.as_ref()
    }

    /// Whether another round may start
    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    /// Mark a round as in progress.
    pub fn begin_round(&mut self) -> Result<(), DomainError> {
        match self.state {
            SessionState::Created | SessionState::RoundRunning => {}
            other => {
                return Err(DomainError::InvalidTransition {
                    from: other.as_str(),
                    to: SessionState::RoundRunning.as_str(),
                });
            }
        }
        if !self.has_rounds_remaining() {
            return Err(DomainError::RoundLimitExceeded {
                max_rounds: self.max_rounds,
            });
        }
        self.state = SessionState::RoundRunning;
        Ok(())
    }

    /// Append a completed round to the history.
    pub fn record_round(&mut self, round: Round) -> Result<(), DomainError> {
        if self.state != SessionState::RoundRunning {
            return Err(DomainError::InvalidTransition {
                from: self.state.as_str(),
                to: SessionState::RoundRunning.as_str(),
            });
        }
        if !self.has_rounds_remaining() {
            return Err(DomainError::RoundLimitExceeded {
                max_rounds: self.max_rounds,
            });
        }
        self.rounds.push(round);
        self.current_round += 1;
        Ok(())
    }

    /// Stop running rounds for the given reason.
    pub fn terminate(&mut self, termination: Termination) -> Result<(), DomainError> {
        let to = SessionState::from(termination);
        if self.state.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.state.as_str(),
                to: to.as_str(),
            });
        }
        self.termination = Some(termination);
        self.state = to;
        Ok(())
    }

    /// Attach the final verdict. Only valid after [`terminate`](Self::terminate).
    pub fn finalize(&mut self, consensus: Consensus) -> Result<(), DomainError> {
        match self.state {
            SessionState::Converged | SessionState::MaxRoundsReached | SessionState::TimedOut => {
                self.consensus = Some(consensus);
                self.state = SessionState::Finalized;
                Ok(())
            }
            other => Err(DomainError::InvalidTransition {
                from: other.as_str(),
                to: SessionState::Finalized.as_str(),
            }),
        }
    }

    /// Sum of completed round durations
    pub fn total_duration_ms(&self) -> u64 {
        self.rounds.iter().map(|r| r.duration_ms).sum()
    }
}
