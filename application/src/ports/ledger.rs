//! Ledger port
//!
//! Defines the interface for publishing attestations to an external ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the ledger
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Ledger is not configured")]
    NotConfigured,

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger rejected attestation (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Acknowledgement returned for an accepted attestation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Ledger-side hash identifying the attestation
    pub hash: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Client for an attestation ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Publish `{action, data, timestamp}` and return the ledger receipt
    async fn attest(
        &self,
        action: &str,
        data: serde_json::Value,
    ) -> Result<LedgerReceipt, LedgerError>;
}
