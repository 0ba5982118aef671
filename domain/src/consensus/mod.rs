//! Consensus engine
//!
//! Turns a round's responses into a measured agreement signal and, at the
//! end of a session, into a [`Consensus`] verdict.
//!
//! ```text
//! responses ──► AgreementScorer ──► agreement score ──► strength / reached / dissent
//!           └─► StanceClassifier ─► VoteTally ────────► decision
//! ```
//!
//! | Score  | Strength   |
//! |--------|------------|
//! | ≥ 0.90 | `strong`   |
//! | ≥ 0.75 | `moderate` |
//! | ≥ 0.60 | `weak`     |
//! | < 0.60 | `none`     |

pub mod agreement;
#[allow(clippy::module_inception)]
pub mod consensus;
pub mod integrity;
pub mod vote;

pub use agreement::{AgreementScorer, KeywordAgreementScorer, NEUTRAL_AGREEMENT, Vocabulary};
pub use consensus::{Consensus, ConsensusEngine, ConsensusStrength, ConsensusThresholds, Decision};
pub use integrity::{IntegrityScore, IntegrityTrend, validate_unit_score};
pub use vote::{Stance, StanceClassifier, VoteTally};
