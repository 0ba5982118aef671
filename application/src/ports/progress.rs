//! Progress notification port
//!
//! Defines the interface for reporting progress during a deliberation.

use delib_domain::{Consensus, Round};
use thiserror::Error;

/// Failure reported by a progress observer.
///
/// Observer failures are logged by the orchestrator and never abort a session.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Progress observer failed: {0}")]
pub struct ProgressError(pub String);

/// Callback for progress updates during a deliberation
///
/// Implementations live in the presentation and infrastructure layers and
/// can display or record progress in various ways (console, JSONL, etc.)
pub trait DeliberationProgress: Send + Sync {
    /// Called before a round's queries are sent
    fn on_round_start(&self, _session_id: &str, _round: usize, _participants: usize) {}

    /// Called once per participant after the round's queries finish
    fn on_participant_complete(&self, _session_id: &str, _participant: &str, _success: bool) {}

    /// Called after a round is scored and appended to the session
    fn on_round_complete(&self, session_id: &str, round: &Round) -> Result<(), ProgressError>;

    /// Called once with the final verdict
    fn on_session_complete(&self, _session_id: &str, _consensus: &Consensus) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DeliberationProgress for NoProgress {
    fn on_round_complete(&self, _session_id: &str, _round: &Round) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// A progress notifier that delegates to multiple inner notifiers.
///
/// Every delegate sees every event; the first round-complete failure is
/// returned after all delegates have run.
pub struct CompositeProgress<'a> {
    delegates: Vec<&'a dyn DeliberationProgress>,
}

impl<'a> CompositeProgress<'a> {
    pub fn new(delegates: Vec<&'a dyn DeliberationProgress>) -> Self {
        Self { delegates }
    }
}

impl DeliberationProgress for CompositeProgress<'_> {
    fn on_round_start(&self, session_id: &str, round: usize, participants: usize) {
        for d in &self.delegates {
            d.on_round_start(session_id, round, participants);
        }
    }

    fn on_participant_complete(&self, session_id: &str, participant: &str, success: bool) {
        for d in &self.delegates {
            d.on_participant_complete(session_id, participant, success);
        }
    }

    fn on_round_complete(&self, session_id: &str, round: &Round) -> Result<(), ProgressError> {
        let mut first_error = None;
        for d in &self.delegates {
            if let Err(e) = d.on_round_complete(session_id, round) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn on_session_complete(&self, session_id: &str, consensus: &Consensus) {
        for d in &self.delegates {
            d.on_session_complete(session_id, consensus);
        }
    }
}
