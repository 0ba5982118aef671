//! Question value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A question to be deliberated (Value Object)
///
/// Guaranteed non-empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Question {
    content: String,
}

impl Question {
    /// Create a new question, rejecting empty or whitespace-only content
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::InvalidQuestion(
                "question cannot be empty".to_string(),
            ));
        }
        Ok(Self { content })
    }

    /// Get the question content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume and return the inner content
    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<String> for Question {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Question::new(s)
    }
}

impl TryFrom<&str> for Question {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Question::new(s)
    }
}

impl From<Question> for String {
    fn from(q: Question) -> Self {
        q.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_creation() {
        let q = Question::new("Should we enable MFA for all users?").unwrap();
        assert_eq!(q.content(), "Should we enable MFA for all users?");
    }

    #[test]
    fn test_empty_question_rejected() {
        assert!(Question::new("").is_err());
        assert!(Question::new("   \n\t").is_err());
    }

    #[test]
    fn test_question_serde_is_plain_string() {
        let q = Question::new("Ship it?").unwrap();
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"Ship it?\"");

        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
        assert!(serde_json::from_str::<Question>("\"  \"").is_err());
    }
}
