//! Prompt templates for deliberation rounds

use crate::core::string::truncate_chars;
use crate::deliberation::{DeliberationContext, ModelResponse};
use serde::{Deserialize, Serialize};

/// Context key whose value is rendered as a "PREVIOUS RESPONSES" block
pub const PREVIOUS_RESPONSES_KEY: &str = "previous_responses";

const DEFAULT_CONSTITUTION: &str = r#"You are a participant in a governed multi-model deliberation.

CONSTITUTION (7 Clauses):
1. Human Dignity & Autonomy - Respect user agency
2. Transparency & Accountability - Be auditable
3. Equity & Inclusion - Serve all fairly
4. Safety & Harm Prevention - Do no harm
5. Privacy & Consent - Protect data
6. Civic Integrity - Maintain public trust
7. Environmental Stewardship - Minimize waste"#;

/// Behavioral constitution prepended to every participant query.
///
/// Immutable once built; the router receives it at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernancePreamble {
    text: String,
    integrity_threshold: f64,
}

impl GovernancePreamble {
    pub fn new(text: impl Into<String>, integrity_threshold: f64) -> Self {
        Self {
            text: text.into(),
            integrity_threshold,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn integrity_threshold(&self) -> f64 {
        self.integrity_threshold
    }

    /// Render the preamble with its integrity requirement
    pub fn render(&self) -> String {
        format!(
            "{}\n\nYou must maintain an integrity score >= {:.2} at all times.",
            self.text.trim_end(),
            self.integrity_threshold
        )
    }

    /// Wrap a prompt with the preamble and any previous-responses context
    pub fn wrap(&self, prompt: &str, context: Option<&DeliberationContext>) -> String {
        let previous = context
            .and_then(|c| c.get(PREVIOUS_RESPONSES_KEY))
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
            .map(|p| format!("PREVIOUS RESPONSES:\n{}\n\n", p))
            .unwrap_or_default();

        format!(
            "{}\n\n{}QUESTION:\n{}\n\nProvide your response, ensuring constitutional compliance.",
            self.render(),
            previous,
            prompt
        )
    }
}

impl Default for GovernancePreamble {
    fn default() -> Self {
        Self::new(DEFAULT_CONSTITUTION, 0.95)
    }
}

/// Templates for the per-round question sent to participants
pub struct RoundPrompt;

impl RoundPrompt {
    /// First round: the bare question
    pub fn initial(question: &str) -> String {
        question.to_string()
    }

    /// Later rounds: the question plus a digest of each prior response
    pub fn refine(question: &str, previous: &[ModelResponse], digest_chars: usize) -> String {
        let digest = previous
            .iter()
            .map(|r| {
                format!(
                    "**{}:** {}",
                    r.participant_id,
                    truncate_chars(&r.content, digest_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"{question}

PREVIOUS RESPONSES FROM OTHER PARTICIPANTS:
{digest}

Given the above responses, provide your refined answer. Focus on:
- Points of agreement
- Key disagreements
- Your final recommendation"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_without_context() {
        let preamble = GovernancePreamble::default();
        let prompt = preamble.wrap("Adopt X?", None);
        assert!(prompt.starts_with("You are a participant"));
        assert!(prompt.contains("7. Environmental Stewardship"));
        assert!(prompt.contains(">= 0.95"));
        assert!(prompt.contains("QUESTION:\nAdopt X?"));
        assert!(!prompt.contains("PREVIOUS RESPONSES"));
        assert!(prompt.ends_with("ensuring constitutional compliance."));
    }

    #[test]
    fn test_wrap_with_previous_responses() {
        let mut context = DeliberationContext::new();
        context.insert(PREVIOUS_RESPONSES_KEY.to_string(), json!("claude: approve"));
        context.insert("ignored".to_string(), json!(1));

        let prompt = GovernancePreamble::new("Be kind.", 0.9).wrap("Q", Some(&context));
        assert!(prompt.contains("PREVIOUS RESPONSES:\nclaude: approve\n"));
        assert!(!prompt.contains("ignored"));
        assert!(prompt.contains(">= 0.90"));
    }

    #[test]
    fn test_initial_is_bare_question() {
        assert_eq!(RoundPrompt::initial("Ship it?"), "Ship it?");
    }

    #[test]
    fn test_refine_digests_responses() {
        let long = "a".repeat(300);
        let previous = vec![
            ModelResponse::new("claude", "m", long),
            ModelResponse::new("gpt4", "m", "Short answer"),
        ];
        let prompt = RoundPrompt::refine("Ship it?", &previous, 200);

        assert!(prompt.starts_with("Ship it?"));
        assert!(prompt.contains(&format!("**claude:** {}...", "a".repeat(200))));
        assert!(!prompt.contains(&"a".repeat(201)));
        assert!(prompt.contains("**gpt4:** Short answer"));
        assert!(prompt.contains("- Key disagreements"));
        assert!(prompt.ends_with("- Your final recommendation"));
    }
}
