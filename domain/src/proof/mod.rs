//! Deliberation proofs
//!
//! Signed, hashable records of finished deliberations plus the canonical
//! JSON rules their hashes and signatures are computed over.

pub mod canonical;
pub mod draft;
pub mod entities;

pub use canonical::{canonical_digest, canonical_json, sha256_hex, to_canonical_json};
pub use draft::ProofDraft;
pub use entities::{
    ClauseChecks, ConsensusResult, DelibProof, DeliberationRound, ModelVote, Signature,
    SignerVerification, VerificationReport,
};
