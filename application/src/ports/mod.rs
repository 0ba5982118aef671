//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod attestation;
pub mod integrity;
pub mod ledger;
pub mod progress;
pub mod provider;
pub mod store;
