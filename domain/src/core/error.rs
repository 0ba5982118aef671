//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No participants configured for deliberation")]
    NoParticipants,

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Invalid score {value} for {field}: must be a finite number in [0, 1]")]
    InvalidScore { field: &'static str, value: f64 },

    #[error("Canonical serialization failed: {0}")]
    Canonicalization(String),

    #[error("Round limit of {max_rounds} reached")]
    RoundLimitExceeded { max_rounds: usize },

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Canonicalization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DomainError::NoParticipants.to_string(),
            "No participants configured for deliberation"
        );
        let err = DomainError::InvalidScore {
            field: "integrity_score",
            value: 1.5,
        };
        assert!(err.to_string().contains("integrity_score"));
    }
}
