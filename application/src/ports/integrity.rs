//! Integrity scoring port
//!
//! The integrity score is computed by an external constitutional scorer;
//! this port only fetches it.

use async_trait::async_trait;
use delib_domain::IntegrityScore;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("Integrity scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid integrity score: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait IntegrityScorer: Send + Sync {
    /// Score an action described by `context`
    async fn score(
        &self,
        action: &str,
        context: &serde_json::Value,
    ) -> Result<IntegrityScore, IntegrityError>;
}
