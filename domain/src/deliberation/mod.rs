//! Deliberation domain: sessions, rounds and participant responses.
//!
//! A [`DeliberationSession`] runs a bounded number of [`Round`]s. Each round
//! fans a prompt out to every participant and collects the
//! [`ModelResponse`]s that came back; participants that failed are simply
//! absent from the round.

pub mod response;
pub mod round;
pub mod session;

pub use response::ModelResponse;
pub use round::{ConvergenceMetrics, Round};
pub use session::{DeliberationContext, DeliberationSession, SessionState, Termination};
