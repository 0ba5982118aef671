//! Application layer for delib-quorum
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{DeliberationParams, RetryPolicy};
pub use ports::{
    attestation::{AttestationError, Attestor},
    integrity::{IntegrityError, IntegrityScorer},
    ledger::{LedgerClient, LedgerError, LedgerReceipt},
    progress::{CompositeProgress, DeliberationProgress, NoProgress, ProgressError},
    provider::{Completion, ProviderAdapter, ProviderError, ProviderRegistry},
    store::{InMemoryStore, KeyedLocks, Store, StoreError},
};
pub use use_cases::deliberate::{
    DELIBERATION_COMPLETE_ACTION, DeliberationError, DeliberationOrchestrator,
};
pub use use_cases::model_router::{ModelRouter, RouterError};
pub use use_cases::proof::{PROOF_SEALED_ACTION, ProofError, ProofGenerator};
