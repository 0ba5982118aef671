//! Proof records.
//!
//! A [`DelibProof`] is the exportable, signed record of a finished
//! deliberation. Everything except the signatures, the sealing metadata and
//! the hash itself forms the *signable payload*; the `proof_hash` covers the
//! signable payload plus every collected signature.

use super::canonical::{canonical_digest, to_canonical_json};
use crate::consensus::ConsensusStrength;
use crate::consensus::validate_unit_score;
use crate::core::error::DomainError;
use crate::deliberation::DeliberationContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map of constitutional clause name to its evaluation result
pub type ClauseChecks = serde_json::Map<String, serde_json::Value>;

/// One participant's position in a recorded round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVote {
    pub participant_id: String,
    pub model: String,
    /// "APPROVE", "REJECT", "ABSTAIN" or a free-form position
    pub position: String,
    pub confidence: f64,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// A round as persisted inside a proof
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationRound {
    pub round_number: usize,
    pub votes: Vec<ModelVote>,
    pub agreement_score: f64,
    #[serde(default)]
    pub convergence_metrics: serde_json::Map<String, serde_json::Value>,
    pub duration_seconds: f64,
}

/// Proof-layer counterpart of [`Consensus`](crate::consensus::Consensus)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub reached: bool,
    pub strength: ConsensusStrength,
    pub agreement_score: f64,
    pub final_decision: String,
    pub supporting_participants: Vec<String>,
    pub dissenting_participants: Vec<String>,
    pub rationale: String,
}

/// A detached signature over a proof's signable payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: String,
    /// Signature scheme, e.g. "ed25519"
    pub algorithm: String,
    /// SHA-256 hex of the signed bytes
    pub payload_digest: String,
    /// Hex-encoded signature bytes
    pub signature: String,
    /// Hex-encoded verifying key of the signer
    pub public_key: String,
}

/// Signed record of a finished deliberation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelibProof {
    pub delib_id: String,
    pub question: String,
    #[serde(default)]
    pub context: DeliberationContext,
    pub rounds: Vec<DeliberationRound>,
    pub total_rounds: usize,
    pub total_duration_seconds: f64,
    pub consensus: ConsensusResult,
    pub integrity_score: f64,
    #[serde(default)]
    pub constitutional_check: ClauseChecks,
    #[serde(default)]
    pub participant_signatures: Vec<Signature>,
    pub validator_signature: Option<Signature>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sealed_to_ledger: bool,
    pub ledger_tx_id: Option<String>,
    pub proof_hash: Option<String>,
}

#[derive(Serialize)]
struct SignablePayload<'a> {
    delib_id: &'a str,
    question: &'a str,
    context: &'a DeliberationContext,
    rounds: &'a [DeliberationRound],
    total_rounds: usize,
    total_duration_seconds: f64,
    consensus: &'a ConsensusResult,
    integrity_score: f64,
    constitutional_check: &'a ClauseChecks,
    created_at: &'a DateTime<Utc>,
}

#[derive(Serialize)]
struct HashedPayload<'a> {
    #[serde(flatten)]
    signable: SignablePayload<'a>,
    participant_signatures: &'a [Signature],
    #[serde(skip_serializing_if = "Option::is_none")]
    validator_signature: Option<&'a Signature>,
}

impl DelibProof {
    /// Build an unsigned proof. Totals are derived from the rounds.
    pub fn new(
        delib_id: impl Into<String>,
        question: impl Into<String>,
        context: DeliberationContext,
        rounds: Vec<DeliberationRound>,
        consensus: ConsensusResult,
        integrity_score: f64,
        constitutional_check: ClauseChecks,
    ) -> Result<Self, DomainError> {
        let integrity_score = validate_unit_score("integrity_score", integrity_score)?;
        validate_unit_score("agreement_score", consensus.agreement_score)?;
        for round in &rounds {
            validate_unit_score("agreement_score", round.agreement_score)?;
        }

        Ok(Self {
            delib_id: delib_id.into(),
            question: question.into(),
            context,
            total_rounds: rounds.len(),
            total_duration_seconds: rounds.iter().map(|r| r.duration_seconds).sum(),
            rounds,
            consensus,
            integrity_score,
            constitutional_check,
            participant_signatures: Vec::new(),
            validator_signature: None,
            created_at: Utc::now(),
            sealed_to_ledger: false,
            ledger_tx_id: None,
            proof_hash: None,
        })
    }

    fn signable(&self) -> SignablePayload<'_> {
        SignablePayload {
            delib_id: &self.delib_id,
            question: &self.question,
            context: &self.context,
            rounds: &self.rounds,
            total_rounds: self.total_rounds,
            total_duration_seconds: self.total_duration_seconds,
            consensus: &self.consensus,
            integrity_score: self.integrity_score,
            constitutional_check: &self.constitutional_check,
            created_at: &self.created_at,
        }
    }

    /// Canonical JSON bytes that every signer signs
    pub fn signable_bytes(&self) -> Result<Vec<u8>, DomainError> {
        Ok(to_canonical_json(&self.signable())?.into_bytes())
    }

    /// SHA-256 over the signable payload plus all collected signatures
    pub fn compute_hash(&self) -> Result<String, DomainError> {
        canonical_digest(&HashedPayload {
            signable: self.signable(),
            participant_signatures: &self.participant_signatures,
            validator_signature: self.validator_signature.as_ref(),
        })
    }

    /// Whether the stored hash still matches the content.
    ///
    /// `None` when no hash has been computed yet.
    pub fn hash_matches(&self) -> Result<Option<bool>, DomainError> {
        match &self.proof_hash {
            None => Ok(None),
            Some(stored) => Ok(Some(*stored == self.compute_hash()?)),
        }
    }

    /// A hashed proof no longer accepts signatures
    pub fn is_finalized(&self) -> bool {
        self.proof_hash.is_some()
    }

    pub fn signer_ids(&self) -> impl Iterator<Item = &str> {
        self.participant_signatures.iter().map(|s| s.signer.as_str())
    }
}

/// Result of checking one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerVerification {
    pub signer: String,
    pub valid: bool,
}

/// Outcome of verifying every signature on a proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub delib_id: String,
    pub total_signatures: usize,
    pub valid_signatures: usize,
    pub all_participants_valid: bool,
    pub validator_signature_valid: bool,
    /// All participant signatures and the validator signature are valid
    pub proof_valid: bool,
    /// Stored hash matches the recomputed one; `None` when unhashed
    pub hash_valid: Option<bool>,
    pub participant_verifications: Vec<SignerVerification>,
    pub verified_at: DateTime<Utc>,
}

impl VerificationReport {
    pub fn new(
        delib_id: impl Into<String>,
        participant_verifications: Vec<SignerVerification>,
        validator_signature_valid: bool,
        hash_valid: Option<bool>,
    ) -> Self {
        let total_signatures = participant_verifications.len();
        let valid_signatures = participant_verifications.iter().filter(|v| v.valid).count();
        let all_participants_valid = valid_signatures == total_signatures;
        Self {
            delib_id: delib_id.into(),
            total_signatures,
            valid_signatures,
            all_participants_valid,
            validator_signature_valid,
            proof_valid: all_participants_valid && validator_signature_valid,
            hash_valid,
            participant_verifications,
            verified_at: Utc::now(),
        }
    }

    /// Signatures valid and stored hash (if any) intact
    pub fn is_intact(&self) -> bool {
        self.proof_valid && self.hash_valid != Some(false)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_totals_derived_from_rounds() {
        let proof = sample_proof();
        assert_eq!(proof.total_rounds, 1);
        assert_eq!(proof.total_duration_seconds, 2.3);
        assert!(!proof.is_finalized());
    }

    #[test]
    fn test_rejects_out_of_range_integrity() {
        let p = sample_proof();
        let result = DelibProof::new(
            "x",
            "q",
            DeliberationContext::new(),
            vec![],
            p.consensus,
            1.2,
            ClauseChecks::new(),
        );
        assert!(matches!(result, Err(DomainError::InvalidScore { .. })));
    }

    #[test]
    fn test_signable_bytes_ignore_signatures_and_sealing() {
        let mut proof = sample_proof();
        let before = proof.signable_bytes().unwrap();
        proof.participant_signatures.push(signature("claude"));
        proof.sealed_to_ledger = true;
        proof.ledger_tx_id = Some("tx".to_string());
        assert_eq!(before, proof.signable_bytes().unwrap());
    }

    #[test]
    fn test_hash_covers_signatures() {
        let mut proof = sample_proof();
        let unsigned = proof.compute_hash().unwrap();
        proof.participant_signatures.push(signature("claude"));
        let signed = proof.compute_hash().unwrap();
        assert_ne!(unsigned, signed);

        proof.proof_hash = Some(signed);
        assert_eq!(proof.hash_matches().unwrap(), Some(true));

        proof.participant_signatures[0].signature = "ac".to_string();
        assert_eq!(proof.hash_matches().unwrap(), Some(false));
    }

    #[test]
    fn test_hash_ignores_ledger_fields() {
        let mut proof = sample_proof();
        let hash = proof.compute_hash().unwrap();
        proof.sealed_to_ledger = true;
        proof.ledger_tx_id = Some("0xabc".to_string());
        assert_eq!(hash, proof.compute_hash().unwrap());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut proof = sample_proof();
        proof.participant_signatures.push(signature("claude"));
        proof.validator_signature = Some(signature("atlas"));
        proof.proof_hash = Some(proof.compute_hash().unwrap());

        let value = serde_json::to_value(&proof).unwrap();
        let back: DelibProof = serde_json::from_value(value).unwrap();
        assert_eq!(back, proof);
        assert_eq!(back.hash_matches().unwrap(), Some(true));
    }

    #[test]
    fn test_report_with_no_participants() {
        let report = VerificationReport::new("d", vec![], true, None);
        assert!(report.all_participants_valid);
        assert!(report.proof_valid);
        assert!(report.is_intact());
    }

    #[test]
    fn test_report_counts() {
        let report = VerificationReport::new(
            "d",
            vec![
                SignerVerification { signer: "a".into(), valid: true },
                SignerVerification { signer: "b".into(), valid: false },
            ],
            true,
            Some(true),
        );
        assert_eq!(report.total_signatures, 2);
        assert_eq!(report.valid_signatures, 1);
        assert!(!report.proof_valid);
    }
}
