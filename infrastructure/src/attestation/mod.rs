//! Proof attestation keys

mod key_ring;

pub use key_ring::{ALGORITHM, Ed25519KeyRing};
