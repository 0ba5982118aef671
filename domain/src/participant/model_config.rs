//! Participant model configuration.
//!
//! A [`ModelConfig`] describes how to reach one reasoning agent: which
//! provider API to call, which model to request, and the generation limits.
//! Configs are immutable once loaded and owned by the model router.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Provider API family a participant is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions API
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini `generateContent` API
    Google,
    /// DeepSeek (OpenAI-compatible) API
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Google,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Conventional environment variable holding this provider's API key
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => Err(DomainError::InvalidProvider(other.to_string())),
        }
    }
}

/// Configuration for a single participant model.
#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    /// Provider API family
    pub provider: ProviderKind,
    /// Provider-side model identifier (e.g. "gpt-4-turbo")
    pub model: String,
    /// API credential; `None` means the participant cannot be queried
    pub api_key: Option<String>,
    /// Override for the provider's base URL
    pub base_url: Option<String>,
    /// Maximum output tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Declared areas of expertise
    pub expertise: Vec<String>,
    /// Voting weight
    pub weight: f64,
}

impl ModelConfig {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            base_url: None,
            max_tokens: 8192,
            temperature: 0.7,
            expertise: Vec::new(),
            weight: 1.0,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_expertise(mut self, tags: Vec<String>) -> Self {
        self.expertise = tags;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// The credential, if present and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

// Keep credentials out of logs.
impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("expertise", &self.expertise)
            .field("weight", &self.weight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("deepseek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert!(matches!(
            "mistral".parse::<ProviderKind>(),
            Err(DomainError::InvalidProvider(p)) if p == "mistral"
        ));
    }

    #[test]
    fn test_provider_kind_roundtrip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_builder_defaults() {
        let config = ModelConfig::new(ProviderKind::Anthropic, "claude-sonnet-4-5")
            .with_api_key("sk-test")
            .with_weight(1.2)
            .with_expertise(vec!["ethics".to_string()]);

        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.credential(), Some("sk-test"));
        assert_eq!(config.weight, 1.2);
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let config = ModelConfig::new(ProviderKind::OpenAi, "gpt-4-turbo").with_api_key("  ");
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ModelConfig::new(ProviderKind::OpenAi, "gpt-4-turbo").with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
