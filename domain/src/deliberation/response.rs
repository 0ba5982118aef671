//! Participant responses collected during a round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from a single participant to a single query.
///
/// Created once per successful query and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Participant identifier (the router's config key, e.g. "claude")
    pub participant_id: String,
    /// Provider-side model identifier that produced the text
    pub model: String,
    /// The response text
    pub content: String,
    /// Tokens consumed (prompt + completion where the provider reports both)
    pub tokens: u32,
    /// Wall-clock latency of the successful attempt, in milliseconds
    pub latency_ms: u64,
    /// When the response was received
    pub timestamp: DateTime<Utc>,
}

impl ModelResponse {
    pub fn new(
        participant_id: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            model: model.into(),
            content: content.into(),
            tokens: 0,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}
