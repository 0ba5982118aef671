//! Proof generator
//!
//! Builds, signs, verifies, seals and (de)serializes [`DelibProof`]s.
//! Operations on the same proof id are serialized; different ids proceed
//! independently.

use crate::ports::attestation::{AttestationError, Attestor};
use crate::ports::ledger::{LedgerClient, LedgerError};
use crate::ports::store::{InMemoryStore, KeyedLocks, Store, StoreError};
use delib_domain::{
    ClauseChecks, DelibProof, DomainError, ProofDraft, SignerVerification, VerificationReport,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ledger action used when sealing an exported proof
pub const PROOF_SEALED_ACTION: &str = "delib_proof_sealed";

/// Errors that can occur during proof operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProofError {
    #[error("Proof not found: {0}")]
    NotFound(String),

    #[error("Proof already exists: {0}")]
    AlreadyExists(String),

    #[error("Proof {0} is finalized and no longer accepts signatures")]
    AlreadyFinalized(String),

    #[error("Proof {id} is already sealed with transaction {tx_id}")]
    AlreadySealed { id: String, tx_id: String },

    #[error("Ledger transaction id must not be empty")]
    EmptyTransactionId,

    #[error("Invalid proof document: {0}")]
    Import(String),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Use case for producing and checking deliberation proofs
pub struct ProofGenerator {
    attestor: Arc<dyn Attestor>,
    store: Arc<dyn Store<DelibProof>>,
    locks: KeyedLocks,
    ledger: Option<Arc<dyn LedgerClient>>,
}

impl ProofGenerator {
    pub fn new(attestor: Arc<dyn Attestor>) -> Self {
        Self {
            attestor,
            store: Arc::new(InMemoryStore::new()),
            locks: KeyedLocks::new(),
            ledger: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn Store<DelibProof>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    async fn load(&self, id: &str) -> Result<DelibProof, ProofError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ProofError::NotFound(id.to_string()))
    }

    async fn load_unfinalized(&self, id: &str) -> Result<DelibProof, ProofError> {
        let proof = self.load(id).await?;
        if proof.is_finalized() {
            return Err(ProofError::AlreadyFinalized(id.to_string()));
        }
        Ok(proof)
    }

    /// Snapshot of a stored proof
    pub async fn proof(&self, id: &str) -> Result<DelibProof, ProofError> {
        let _lock = self.locks.lock(id).await;
        self.load(id).await
    }

    /// Create and store an unsigned proof from a finished deliberation.
    pub async fn generate(
        &self,
        draft: ProofDraft,
        integrity_score: f64,
        constitutional_check: ClauseChecks,
    ) -> Result<DelibProof, ProofError> {
        let _lock = self.locks.lock(&draft.delib_id).await;
        if self.store.get(&draft.delib_id).await?.is_some() {
            return Err(ProofError::AlreadyExists(draft.delib_id));
        }

        let proof = DelibProof::new(
            draft.delib_id,
            draft.question,
            draft.context,
            draft.rounds,
            draft.consensus,
            integrity_score,
            constitutional_check,
        )?;
        info!(
            "Generated proof {} ({} round(s), {})",
            proof.delib_id, proof.total_rounds, proof.consensus.final_decision
        );
        self.store.put(&proof.delib_id, proof.clone()).await?;
        Ok(proof)
    }

    /// Collect one signature per participant over the signable payload.
    ///
    /// Participants without signing material are skipped with a warning.
    /// Replaces any previously collected participant signatures.
    pub async fn sign_by_participants(
        &self,
        id: &str,
        participant_ids: &[String],
    ) -> Result<DelibProof, ProofError> {
        let _lock = self.locks.lock(id).await;
        let mut proof = self.load_unfinalized(id).await?;
        let payload = proof.signable_bytes()?;

        let mut signatures = Vec::with_capacity(participant_ids.len());
        for participant in participant_ids {
            if !self.attestor.can_sign(participant) {
                warn!("Could not sign proof {} as {}: no signing key", id, participant);
                continue;
            }
            match self.attestor.sign(participant, &payload) {
                Ok(signature) => signatures.push(signature),
                Err(e) => warn!("Could not sign proof {} as {}: {}", id, participant, e),
            }
        }

        info!(
            "Proof {}: {}/{} participant signature(s) collected",
            id,
            signatures.len(),
            participant_ids.len()
        );
        proof.participant_signatures = signatures;
        self.store.put(id, proof.clone()).await?;
        Ok(proof)
    }

    /// Validator approval; computes the final `proof_hash`.
    pub async fn sign_by_validator(
        &self,
        id: &str,
        validator_id: &str,
    ) -> Result<DelibProof, ProofError> {
        let _lock = self.locks.lock(id).await;
        let mut proof = self.load_unfinalized(id).await?;
        let payload = proof.signable_bytes()?;

        proof.validator_signature = Some(self.attestor.sign(validator_id, &payload)?);
        let hash = proof.compute_hash()?;
        info!("Proof {} finalized by {} ({})", id, validator_id, hash);
        proof.proof_hash = Some(hash);

        self.store.put(id, proof.clone()).await?;
        Ok(proof)
    }

    /// Re-check every signature and the stored hash.
    pub async fn verify(&self, id: &str) -> Result<VerificationReport, ProofError> {
        let _lock = self.locks.lock(id).await;
        let proof = self.load(id).await?;
        self.verify_proof(&proof)
    }

    /// Verify a proof that is not (necessarily) in the store
    pub fn verify_proof(&self, proof: &DelibProof) -> Result<VerificationReport, ProofError> {
        let payload = proof.signable_bytes()?;

        let participant_verifications = proof
            .participant_signatures
            .iter()
            .map(|sig| SignerVerification {
                signer: sig.signer.clone(),
                valid: self.attestor.verify(sig, &payload),
            })
            .collect();
        let validator_valid = proof
            .validator_signature
            .as_ref()
            .is_some_and(|sig| self.attestor.verify(sig, &payload));

        let report = VerificationReport::new(
            proof.delib_id.clone(),
            participant_verifications,
            validator_valid,
            proof.hash_matches()?,
        );
        debug!(
            "Verified proof {}: {}/{} participant signature(s) valid, validator {}",
            proof.delib_id, report.valid_signatures, report.total_signatures, validator_valid
        );
        Ok(report)
    }

    /// Record an externally supplied ledger transaction id.
    ///
    /// Repeating with the same id is a no-op; a different id is rejected.
    pub async fn seal_to_ledger(&self, id: &str, tx_id: &str) -> Result<DelibProof, ProofError> {
        let tx_id = tx_id.trim();
        if tx_id.is_empty() {
            return Err(ProofError::EmptyTransactionId);
        }

        let _lock = self.locks.lock(id).await;
        let mut proof = self.load(id).await?;

        match proof.ledger_tx_id.as_deref() {
            Some(existing) if proof.sealed_to_ledger && existing == tx_id => return Ok(proof),
            Some(existing) if proof.sealed_to_ledger => {
                return Err(ProofError::AlreadySealed {
                    id: id.to_string(),
                    tx_id: existing.to_string(),
                });
            }
            _ => {}
        }

        if !proof.is_finalized() {
            warn!("Sealing proof {} before validator approval", id);
        }
        proof.sealed_to_ledger = true;
        proof.ledger_tx_id = Some(tx_id.to_string());
        info!("Proof {} sealed to ledger ({})", id, tx_id);

        self.store.put(id, proof.clone()).await?;
        Ok(proof)
    }

    /// Attest the exported proof through the ledger and seal it with the
    /// returned hash. Ledger failures are fatal here.
    pub async fn seal_with_ledger(&self, id: &str) -> Result<DelibProof, ProofError> {
        let ledger = self.ledger.as_ref().ok_or(LedgerError::NotConfigured)?;
        let exported = self.export(id).await?;
        let receipt = ledger.attest(PROOF_SEALED_ACTION, exported).await?;
        self.seal_to_ledger(id, &receipt.hash).await
    }

    /// Export a proof as a JSON document with sorted keys
    pub async fn export(&self, id: &str) -> Result<serde_json::Value, ProofError> {
        let proof = self.proof(id).await?;
        Ok(serde_json::to_value(&proof).map_err(DomainError::from)?)
    }

    /// Store a proof from an exported document, replacing any proof with the
    /// same id. A stale `proof_hash` is kept but reported.
    pub async fn import(&self, document: serde_json::Value) -> Result<DelibProof, ProofError> {
        let proof: DelibProof =
            serde_json::from_value(document).map_err(|e| ProofError::Import(e.to_string()))?;
        if proof.total_rounds != proof.rounds.len() {
            return Err(ProofError::Import(format!(
                "total_rounds is {} but {} round(s) are recorded",
                proof.total_rounds,
                proof.rounds.len()
            )));
        }

        let _lock = self.locks.lock(&proof.delib_id).await;
        if proof.hash_matches()? == Some(false) {
            warn!("Imported proof {} has a stale proof_hash", proof.delib_id);
        }
        self.store.put(&proof.delib_id, proof.clone()).await?;
        info!("Imported proof {}", proof.delib_id);
        Ok(proof)
    }
}
