//! Ledger attestation over HTTP

mod http;

pub use http::{DEFAULT_LEDGER_TIMEOUT, HttpLedgerClient};
