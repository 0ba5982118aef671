//! Logging infrastructure: structured deliberation transcripts.
//!
//! Provides [`JsonlTranscriptLogger`], a JSONL file writer that implements
//! the [`DeliberationProgress`](delib_application::DeliberationProgress) port.

mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscriptLogger;
