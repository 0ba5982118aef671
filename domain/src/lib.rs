//! Domain layer for delib-quorum
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Deliberation
//!
//! A question is put to several independent models over a bounded number of
//! rounds. Each round shows participants a digest of the previous round, so
//! positions can converge.
//!
//! ## Consensus
//!
//! Every round is scored for agreement. A score at or above the convergence
//! threshold ends the session early; otherwise the last round decides.
//!
//! ## Proof
//!
//! A finished deliberation can be turned into a [`DelibProof`]: a signed,
//! hashed, exportable record of every round and the final verdict.

pub mod consensus;
pub mod core;
pub mod deliberation;
pub mod participant;
pub mod proof;
pub mod prompt;

// Re-export commonly used types
pub use consensus::{
    AgreementScorer, Consensus, ConsensusEngine, ConsensusStrength, ConsensusThresholds, Decision,
    IntegrityScore, IntegrityTrend, KeywordAgreementScorer, NEUTRAL_AGREEMENT, Stance,
    StanceClassifier, Vocabulary, VoteTally,
};
pub use core::{error::DomainError, question::Question};
pub use deliberation::{
    ConvergenceMetrics, DeliberationContext, DeliberationSession, ModelResponse, Round,
    SessionState, Termination,
};
pub use participant::{ModelConfig, ProviderKind};
pub use proof::{
    ClauseChecks, ConsensusResult, DelibProof, DeliberationRound, ModelVote, ProofDraft,
    Signature, SignerVerification, VerificationReport,
};
pub use prompt::{GovernancePreamble, PREVIOUS_RESPONSES_KEY, RoundPrompt};
