//! Use cases (application services)
//!
//! - [`model_router`]: prompt routing, retries and fan-out
//! - [`deliberate`]: session lifecycle and the bounded round loop
//! - [`proof`]: proof generation, signing, verification and sealing

pub mod deliberate;
pub mod model_router;
pub mod proof;
