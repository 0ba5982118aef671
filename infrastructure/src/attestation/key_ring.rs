//! In-process Ed25519 key ring
//!
//! Holds signing keys for the participants and validator this process signs
//! for, plus verifying keys it trusts for everyone else. Verification only
//! succeeds against a registered key; the public key embedded in a
//! [`Signature`] must match it.

use delib_application::{AttestationError, Attestor};
use delib_domain::Signature;
use delib_domain::proof::sha256_hex;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

pub const ALGORITHM: &str = "ed25519";

#[derive(Default)]
struct Keys {
    signing: HashMap<String, SigningKey>,
    verifying: HashMap<String, VerifyingKey>,
}

/// [`Attestor`] over Ed25519 keys held in memory
#[derive(Default)]
pub struct Ed25519KeyRing {
    keys: RwLock<Keys>,
}

impl Ed25519KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh keypair for `signer` and return its hex verifying key.
    ///
    /// Replaces any key previously held for the signer.
    pub fn generate_keypair(&self, signer: &str) -> String {
        self.insert_signing_key(signer, SigningKey::generate(&mut OsRng))
    }

    /// Adopt an existing signing key; returns its hex verifying key
    pub fn insert_signing_key(&self, signer: &str, key: SigningKey) -> String {
        let verifying = key.verifying_key();
        let public_hex = hex::encode(verifying.as_bytes());

        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.signing.insert(signer.to_string(), key);
        keys.verifying.insert(signer.to_string(), verifying);
        debug!(signer, public_key = %public_hex, "Registered signing key");
        public_hex
    }

    /// Trust a signer's hex-encoded verifying key
    pub fn register_verifying_key(
        &self,
        signer: &str,
        public_key_hex: &str,
    ) -> Result<(), AttestationError> {
        let verifying = parse_verifying_key(signer, public_key_hex)?;
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.verifying.insert(signer.to_string(), verifying);
        Ok(())
    }

    /// Hex verifying key registered for a signer
    pub fn public_key(&self, signer: &str) -> Option<String> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.verifying.get(signer).map(|k| hex::encode(k.as_bytes()))
    }

    /// Signers this ring trusts, sorted
    pub fn trusted_signers(&self) -> Vec<String> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let mut signers: Vec<_> = keys.verifying.keys().cloned().collect();
        signers.sort();
        signers
    }
}

fn parse_verifying_key(signer: &str, public_key_hex: &str) -> Result<VerifyingKey, AttestationError> {
    let invalid = |reason: String| AttestationError::InvalidKey {
        signer: signer.to_string(),
        reason,
    };
    let bytes = hex::decode(public_key_hex.trim()).map_err(|e| invalid(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, got {}", b.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))
}

fn parse_signature(signature_hex: &str) -> Option<ed25519_dalek::Signature> {
    let bytes: [u8; 64] = hex::decode(signature_hex).ok()?.try_into().ok()?;
    Some(ed25519_dalek::Signature::from_bytes(&bytes))
}

impl Attestor for Ed25519KeyRing {
    fn can_sign(&self, signer: &str) -> bool {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        keys.signing.contains_key(signer)
    }

    fn sign(&self, signer: &str, payload: &[u8]) -> Result<Signature, AttestationError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let key = keys
            .signing
            .get(signer)
            .ok_or_else(|| AttestationError::UnknownSigner(signer.to_string()))?;

        let signature = key
            .try_sign(payload)
            .map_err(|e| AttestationError::Signing(e.to_string()))?;

        Ok(Signature {
            signer: signer.to_string(),
            algorithm: ALGORITHM.to_string(),
            payload_digest: sha256_hex(payload),
            signature: hex::encode(signature.to_bytes()),
            public_key: hex::encode(key.verifying_key().as_bytes()),
        })
    }

    fn verify(&self, signature: &Signature, payload: &[u8]) -> bool {
        if signature.algorithm != ALGORITHM || signature.payload_digest != sha256_hex(payload) {
            return false;
        }

        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let Some(trusted) = keys.verifying.get(&signature.signer) else {
            debug!(signer = %signature.signer, "No trusted key for signer");
            return false;
        };
        if hex::encode(trusted.as_bytes()) != signature.public_key.to_lowercase() {
            return false;
        }

        parse_signature(&signature.signature)
            .is_some_and(|sig| trusted.verify(payload, &sig).is_ok())
    }
}

impl std::fmt::Debug for Ed25519KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyRing")
            .field("trusted_signers", &self.trusted_signers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(signers: &[&str]) -> Ed25519KeyRing {
        let ring = Ed25519KeyRing::new();
        for (i, signer) in signers.iter().enumerate() {
            ring.insert_signing_key(signer, SigningKey::from_bytes(&[i as u8 + 1; 32]));
        }
        ring
    }

    #[test]
    fn test_sign_and_verify() {
        let ring = ring_with(&["claude"]);
        let sig = ring.sign("claude", b"payload").unwrap();

        assert_eq!(sig.algorithm, "ed25519");
        assert_eq!(sig.payload_digest, sha256_hex(b"payload"));
        assert_eq!(sig.signature.len(), 128);
        assert_eq!(Some(sig.public_key.clone()), ring.public_key("claude"));
        assert!(ring.verify(&sig, b"payload"));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let ring = ring_with(&["claude"]);
        let sig = ring.sign("claude", b"payload").unwrap();
        assert!(!ring.verify(&sig, b"payload!"));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let ring = ring_with(&["claude"]);
        let mut sig = ring.sign("claude", b"payload").unwrap();
        let flipped = if sig.signature.starts_with("00") { "11" } else { "00" };
        sig.signature.replace_range(0..2, flipped);
        assert!(!ring.verify(&sig, b"payload"));

        sig.signature = "zz".into();
        assert!(!ring.verify(&sig, b"payload"));
    }

    #[test]
    fn test_unknown_signer() {
        let ring = ring_with(&["claude"]);
        assert!(!ring.can_sign("gpt4"));
        assert_eq!(
            ring.sign("gpt4", b"x"),
            Err(AttestationError::UnknownSigner("gpt4".into()))
        );
    }

    #[test]
    fn test_verify_requires_registered_key() {
        let signer_ring = ring_with(&["claude"]);
        let sig = signer_ring.sign("claude", b"payload").unwrap();

        let verifier = Ed25519KeyRing::new();
        assert!(!verifier.verify(&sig, b"payload"));

        verifier
            .register_verifying_key("claude", &sig.public_key)
            .unwrap();
        assert!(verifier.verify(&sig, b"payload"));
        assert!(!verifier.can_sign("claude"));
    }

    #[test]
    fn test_embedded_key_must_match_registered_key() {
        let honest = ring_with(&["claude"]);
        let impostor = Ed25519KeyRing::new();
        impostor.insert_signing_key("claude", SigningKey::from_bytes(&[9; 32]));

        let forged = impostor.sign("claude", b"payload").unwrap();
        assert!(!honest.verify(&forged, b"payload"));
    }

    #[test]
    fn test_register_rejects_bad_keys() {
        let ring = Ed25519KeyRing::new();
        assert!(matches!(
            ring.register_verifying_key("x", "not-hex"),
            Err(AttestationError::InvalidKey { .. })
        ));
        assert!(matches!(
            ring.register_verifying_key("x", "abcd"),
            Err(AttestationError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_generate_keypair_replaces_key() {
        let ring = Ed25519KeyRing::new();
        let first = ring.generate_keypair("validator");
        let second = ring.generate_keypair("validator");
        assert_ne!(first, second);
        assert_eq!(ring.public_key("validator"), Some(second));
        assert_eq!(ring.trusted_signers(), vec!["validator".to_string()]);
    }
}
