//! Prompt domain
//!
//! The governance preamble every query is wrapped in, and the per-round
//! question templates.

mod template;

pub use template::{GovernancePreamble, PREVIOUS_RESPONSES_KEY, RoundPrompt};
