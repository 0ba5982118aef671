//! Attestation port
//!
//! Signs and verifies proof payloads on behalf of named signers.

use delib_domain::{DomainError, Signature};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttestationError {
    #[error("No signing key for {0}")]
    UnknownSigner(String),

    #[error("Invalid key material for {signer}: {reason}")]
    InvalidKey { signer: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Signing authority for proof payloads.
///
/// Implementations hold key material; the application layer only passes
/// payload bytes and signer ids.
pub trait Attestor: Send + Sync {
    /// Whether `signer` has signing material
    fn can_sign(&self, signer: &str) -> bool;

    fn sign(&self, signer: &str, payload: &[u8]) -> Result<Signature, AttestationError>;

    /// Check a signature against the payload it claims to cover
    fn verify(&self, signature: &Signature, payload: &[u8]) -> bool;
}
