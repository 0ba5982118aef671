//! Deliberation orchestrator
//!
//! Runs a session as a bounded loop of rounds:
//!
//! ```text
//! timeout? ──yes──► TIMEOUT verdict
//!    │no
//! rounds left? ──no──► verdict from last round
//!    │yes
//! prompt ─► fan out ─► score ─► append ─► notify ─► converged? ──yes──► verdict
//!    ▲                                                  │no
//!    └──────────────────────────────────────────────────┘
//! ```

use super::model_router::ModelRouter;
use crate::config::DeliberationParams;
use crate::ports::integrity::IntegrityScorer;
use crate::ports::ledger::LedgerClient;
use crate::ports::progress::DeliberationProgress;
use crate::ports::store::{InMemoryStore, Store, StoreError};
use delib_domain::{
    AgreementScorer, Consensus, ConsensusEngine, ConvergenceMetrics, DeliberationContext,
    DeliberationSession, DomainError, KeywordAgreementScorer, Question, Round, RoundPrompt,
    SessionState, Termination,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ledger action published when a session finishes
pub const DELIBERATION_COMPLETE_ACTION: &str = "deliberation_complete";

/// Errors that can occur while managing deliberation sessions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliberationError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} is already running")]
    AlreadyRunning(String),

    #[error("Session {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Removes a session id from the running set when dropped
struct RunningGuard {
    running: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
    }
}

/// Drives deliberation sessions from creation to a final [`Consensus`].
pub struct DeliberationOrchestrator {
    router: ModelRouter,
    engine: ConsensusEngine,
    params: DeliberationParams,
    store: Arc<dyn Store<DeliberationSession>>,
    running: Arc<Mutex<HashSet<String>>>,
    counter: AtomicU64,
    ledger: Option<Arc<dyn LedgerClient>>,
    integrity: Option<Arc<dyn IntegrityScorer>>,
}

impl DeliberationOrchestrator {
    pub fn new(router: ModelRouter, params: DeliberationParams) -> Self {
        let engine = ConsensusEngine::new(Arc::new(KeywordAgreementScorer::default()))
            .with_thresholds(params.thresholds);
        Self {
            router,
            engine,
            params,
            store: Arc::new(InMemoryStore::new()),
            running: Arc::new(Mutex::new(HashSet::new())),
            counter: AtomicU64::new(0),
            ledger: None,
            integrity: None,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn AgreementScorer>) -> Self {
        self.engine = ConsensusEngine::new(scorer).with_thresholds(self.params.thresholds);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn Store<DeliberationSession>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_integrity_scorer(mut self, scorer: Arc<dyn IntegrityScorer>) -> Self {
        self.integrity = Some(scorer);
        self
    }

    pub fn params(&self) -> &DeliberationParams {
        &self.params
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    fn next_session_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("delib_{}_{}", chrono::Utc::now().timestamp_millis(), n)
    }

    /// Create a session without contacting any participant.
    pub async fn create_session(
        &self,
        question: &str,
        participant_ids: Vec<String>,
        context: DeliberationContext,
    ) -> Result<String, DeliberationError> {
        let question = Question::new(question)?;
        if let Some(unknown) = participant_ids.iter().find(|p| !self.router.is_known(p)) {
            return Err(DeliberationError::UnknownParticipant(unknown.clone()));
        }

        let id = self.next_session_id();
        let session = DeliberationSession::new(
            id.clone(),
            question,
            participant_ids,
            context,
            self.params.max_rounds,
            self.params.timeout,
        )?;

        info!(
            "Created session {} with {} participant(s), max {} rounds",
            id,
            session.participants.len(),
            session.max_rounds
        );
        self.store.put(&id, session).await?;
        Ok(id)
    }

    /// Snapshot of a session
    pub async fn session(&self, session_id: &str) -> Result<DeliberationSession, DeliberationError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| DeliberationError::NotFound(session_id.to_string()))
    }

    /// Remove a session that is not currently running
    pub async fn discard_session(
        &self,
        session_id: &str,
    ) -> Result<DeliberationSession, DeliberationError> {
        if self.is_running(session_id) {
            return Err(DeliberationError::AlreadyRunning(session_id.to_string()));
        }
        self.store
            .delete(session_id)
            .await?
            .ok_or_else(|| DeliberationError::NotFound(session_id.to_string()))
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(session_id)
    }

    fn claim(&self, session_id: &str) -> Result<RunningGuard, DeliberationError> {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !running.insert(session_id.to_string()) {
            return Err(DeliberationError::AlreadyRunning(session_id.to_string()));
        }
        Ok(RunningGuard {
            running: Arc::clone(&self.running),
            id: session_id.to_string(),
        })
    }

    /// Run a session to its final verdict.
    ///
    /// Timeout is soft: an in-flight round always completes, the check only
    /// prevents the next one from starting.
    pub async fn run_session(
        &self,
        session_id: &str,
        progress: &dyn DeliberationProgress,
    ) -> Result<Consensus, DeliberationError> {
        let _guard = self.claim(session_id)?;
        let mut session = self.session(session_id).await?;
        if session.state() == SessionState::Finalized {
            return Err(DeliberationError::AlreadyFinalized(session_id.to_string()));
        }

        info!(
            "Running session {}: \"{}\"",
            session.id,
            session.question.content()
        );
        let started = Instant::now();

        let consensus = loop {
            if !session.has_rounds_remaining() {
                info!("Session {} reached max rounds ({})", session.id, session.max_rounds);
                session.terminate(Termination::MaxRoundsReached)?;
                break self.engine.conclude(session.last_round());
            }

            // Only guards the start of a new round
            if started.elapsed() > session.timeout {
                warn!(
                    "Session {} timed out after {} round(s)",
                    session.id,
                    session.current_round()
                );
                session.terminate(Termination::TimedOut)?;
                break Consensus::timeout(session.timeout.as_secs());
            }

            let round = self.run_round(&mut session, progress).await?;
            let score = round.agreement_score;

            self.store.put(&session.id, session.clone()).await?;
            if let Err(e) = progress.on_round_complete(&session.id, &round) {
                warn!("Progress observer failed for session {}: {}", session.id, e);
            }

            if self.engine.is_converged(score) {
                info!(
                    "Session {} converged in round {} (agreement {:.2})",
                    session.id, round.number, score
                );
                session.terminate(Termination::Converged)?;
                break self.engine.conclude(session.last_round());
            }
        };

        let consensus = self.attach_integrity(&session, consensus).await;
        session.finalize(consensus.clone())?;
        self.store.put(&session.id, session.clone()).await?;

        info!(
            "Session {} finished: {} ({}, agreement {:.2})",
            session.id, consensus.decision, consensus.strength, consensus.agreement_score
        );
        progress.on_session_complete(&session.id, &consensus);
        self.publish_completion(&session, &consensus).await;

        Ok(consensus)
    }

    async fn run_round(
        &self,
        session: &mut DeliberationSession,
        progress: &dyn DeliberationProgress,
    ) -> Result<Round, DeliberationError> {
        session.begin_round()?;
        let number = session.current_round() + 1;
        info!("Session {}: round {}/{}", session.id, number, session.max_rounds);
        progress.on_round_start(&session.id, number, session.participants.len());

        let prompt = match session.last_round() {
            None => RoundPrompt::initial(session.question.content()),
            Some(previous) => RoundPrompt::refine(
                session.question.content(),
                &previous.responses,
                self.params.digest_chars,
            ),
        };

        let round_started = Instant::now();
        let outcomes = self
            .router
            .query_each(&prompt, &session.participants, Some(&session.context))
            .await;

        let mut responses = Vec::with_capacity(outcomes.len());
        for (participant, result) in outcomes {
            progress.on_participant_complete(&session.id, &participant, result.is_ok());
            if let Ok(response) = result {
                responses.push(response);
            }
        }

        let score = self.engine.agreement(&responses);
        let tally = self.engine.tally(&responses);
        let metrics = ConvergenceMetrics {
            expected: session.participants.len(),
            responded: responses.len(),
            score_delta: session.last_round().map(|r| score - r.agreement_score),
            approve: tally.approve.len(),
            reject: tally.reject.len(),
            abstain: tally.abstain.len(),
        };
        debug!(
            "Session {} round {}: {}/{} responded, agreement {:.2} {}",
            session.id,
            number,
            metrics.responded,
            metrics.expected,
            score,
            tally.vote_summary()
        );

        let duration_ms = round_started.elapsed().as_millis() as u64;
        let round = Round::new(number, responses, score, metrics, duration_ms);
        session.record_round(round.clone())?;
        Ok(round)
    }

    async fn attach_integrity(&self, session: &DeliberationSession, consensus: Consensus) -> Consensus {
        let Some(scorer) = &self.integrity else {
            return consensus;
        };
        let context = json!({
            "session_id": session.id,
            "question": session.question.content(),
            "decision": consensus.decision,
            "agreement_score": consensus.agreement_score,
        });
        match scorer.score("deliberation_consensus", &context).await {
            Ok(score) => consensus.with_integrity(score),
            Err(e) => {
                warn!("Integrity scoring failed for session {}: {}", session.id, e);
                consensus
            }
        }
    }

    async fn publish_completion(&self, session: &DeliberationSession, consensus: &Consensus) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let data = json!({
            "session_id": session.id,
            "question": session.question.content(),
            "rounds": session.current_round(),
            "decision": consensus.decision,
            "strength": consensus.strength,
            "agreement_score": consensus.agreement_score,
        });
        match ledger.attest(DELIBERATION_COMPLETE_ACTION, data).await {
            Ok(receipt) => debug!("Published completion of {} ({})", session.id, receipt.hash),
            Err(e) => warn!("Failed to publish completion of {}: {}", session.id, e),
        }
    }
}
