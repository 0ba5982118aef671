//! Participant configuration from TOML (`[participants.<id>]` tables)
//!
//! ```toml
//! [participants.claude]
//! provider = "anthropic"
//! model = "claude-sonnet-4-5-20250929"
//! expertise = ["ethics", "architecture"]
//! weight = 1.2
//! ```
//!
//! Credentials resolve in order: inline `api_key`, the variable named by
//! `api_key_env`, then the provider's conventional variable.

use super::ConfigIssue;
use delib_domain::{ModelConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw `[participants.<id>]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub expertise: Vec<String>,
    pub weight: f64,
}

impl Default for FileParticipantConfig {
    fn default() -> Self {
        let defaults = ModelConfig::new(ProviderKind::Anthropic, "");
        Self {
            provider: String::new(),
            model: String::new(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            expertise: Vec::new(),
            weight: defaults.weight,
        }
    }
}

impl FileParticipantConfig {
    /// Build a [`ModelConfig`], reading credentials through `env`.
    ///
    /// Unknown providers and empty model names are errors; a missing
    /// credential is only a warning, the router reports it per query.
    pub fn resolve(
        &self,
        id: &str,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> (Option<ModelConfig>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = |name: &str| format!("participants.{id}.{name}");

        let provider = match self.provider.parse::<ProviderKind>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                issues.push(ConfigIssue::error(
                    field("provider"),
                    format!(
                        "unknown provider '{}' (expected one of: {})",
                        self.provider,
                        ProviderKind::ALL.map(|k| k.as_str()).join(", ")
                    ),
                ));
                None
            }
        };
        if self.model.trim().is_empty() {
            issues.push(ConfigIssue::error(field("model"), "model name cannot be empty"));
        }
        let Some(provider) = provider.filter(|_| !self.model.trim().is_empty()) else {
            return (None, issues);
        };

        let api_key = self.credential(provider, env);
        if api_key.is_none() {
            issues.push(ConfigIssue::warning(
                field("api_key"),
                format!(
                    "no credential found (set {} or api_key)",
                    self.api_key_env
                        .as_deref()
                        .unwrap_or(provider.default_api_key_env())
                ),
            ));
        }

        let mut config = ModelConfig::new(provider, self.model.trim())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_expertise(self.expertise.clone())
            .with_weight(self.weight);
        config.api_key = api_key;
        config.base_url = self.base_url.clone();

        (Some(config), issues)
    }

    fn credential(
        &self,
        provider: ProviderKind,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let non_blank = |v: String| (!v.trim().is_empty()).then_some(v);

        self.api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| self.api_key_env.as_deref().and_then(env).and_then(non_blank))
            .or_else(|| env(provider.default_api_key_env()).and_then(non_blank))
    }
}

/// Resolve every participant table, collecting issues from all of them
pub fn resolve_participants(
    participants: &BTreeMap<String, FileParticipantConfig>,
    env: &dyn Fn(&str) -> Option<String>,
) -> (HashMap<String, ModelConfig>, Vec<ConfigIssue>) {
    let mut resolved = HashMap::new();
    let mut issues = Vec::new();

    for (id, participant) in participants {
        let (config, participant_issues) = participant.resolve(id, env);
        issues.extend(participant_issues);
        if let Some(config) = config {
            resolved.insert(id.clone(), config);
        }
    }

    (resolved, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Severity;

    fn env_with(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    fn participant(provider: &str, model: &str) -> FileParticipantConfig {
        FileParticipantConfig {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_with_default_env_var() {
        let env = env_with(&[("OPENAI_API_KEY", "sk-test")]);
        let (config, issues) = participant("openai", "gpt-4-turbo").resolve("gpt4", &env);

        let config = config.unwrap();
        assert!(issues.is_empty());
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.credential(), Some("sk-test"));
        assert_eq!(config.max_tokens, 8192);
    }

    #[test]
    fn test_credential_precedence() {
        let env = env_with(&[("MY_KEY", "from-custom"), ("ANTHROPIC_API_KEY", "from-default")]);

        let mut p = participant("anthropic", "claude");
        p.api_key_env = Some("MY_KEY".into());
        assert_eq!(p.resolve("c", &env).0.unwrap().credential(), Some("from-custom"));

        p.api_key = Some("inline".into());
        assert_eq!(p.resolve("c", &env).0.unwrap().credential(), Some("inline"));

        p.api_key = Some("  ".into());
        p.api_key_env = Some("UNSET".into());
        assert_eq!(p.resolve("c", &env).0.unwrap().credential(), Some("from-default"));
    }

    #[test]
    fn test_missing_credential_is_warning() {
        let env = env_with(&[]);
        let (config, issues) = participant("google", "gemini-2.0-flash").resolve("gemini", &env);

        assert!(config.unwrap().credential().is_none());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_unknown_provider_and_empty_model() {
        let env = env_with(&[]);
        let (config, issues) = participant("mistral", " ").resolve("m", &env);

        assert!(config.is_none());
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
        assert_eq!(issues[0].field, "participants.m.provider");
        assert_eq!(issues[1].field, "participants.m.model");
    }

    #[test]
    fn test_resolve_participants_skips_invalid() {
        let env = env_with(&[("DEEPSEEK_API_KEY", "k")]);
        let mut tables = BTreeMap::new();
        tables.insert("deepseek".to_string(), participant("deepseek", "deepseek-chat"));
        tables.insert("broken".to_string(), participant("nope", "x"));

        let (resolved, issues) = resolve_participants(&tables, &env);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key("deepseek"));
        assert_eq!(issues.len(), 1);
    }
}
