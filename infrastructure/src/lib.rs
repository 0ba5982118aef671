//! Infrastructure layer for delib-quorum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: provider HTTP clients, the ledger client,
//! the Ed25519 key ring, transcript logging, and configuration file loading.

pub mod attestation;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use attestation::Ed25519KeyRing;
pub use config::{
    ConfigIssue, ConfigLoader, ConfigSource, ConfigSourceKind, FileConfig, FileOutputConfig,
    FileOutputFormat, FileParticipantConfig, Severity,
};
pub use ledger::HttpLedgerClient;
pub use logging::JsonlTranscriptLogger;
pub use providers::{
    AnthropicAdapter, DEFAULT_REQUEST_TIMEOUT, GoogleAdapter, OpenAiCompatibleAdapter,
    default_registry, http_client,
};
