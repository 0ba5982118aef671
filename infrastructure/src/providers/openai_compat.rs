//! OpenAI-compatible Chat Completions adapter
//!
//! Serves both OpenAI and DeepSeek, which share the wire format and
//! differ only in base URL.

use super::{base_url, require_credential, send_json};
use async_trait::async_trait;
use delib_application::{Completion, ProviderAdapter, ProviderError};
use delib_domain::{ModelConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Calls `POST {base}/chat/completions` with bearer authentication
pub struct OpenAiCompatibleAdapter {
    kind: ProviderKind,
    default_base_url: &'static str,
    client: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    pub fn openai(client: reqwest::Client) -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            default_base_url: OPENAI_BASE_URL,
            client,
        }
    }

    pub fn deepseek(client: reqwest::Client) -> Self {
        Self {
            kind: ProviderKind::DeepSeek,
            default_base_url: DEEPSEEK_BASE_URL,
            client,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(prompt: &'a str, config: &'a ModelConfig) -> Self {
        Self {
            model: &config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl TryFrom<ChatResponse> for Completion {
    type Error = ProviderError;

    fn try_from(response: ChatResponse) -> Result<Self, Self::Error> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;
        let tokens = response.usage.map_or(0, |u| u.total_tokens);
        Ok(Completion::new(text, tokens))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn send(&self, prompt: &str, config: &ModelConfig) -> Result<Completion, ProviderError> {
        let api_key = require_credential(config)?;
        let url = format!(
            "{}/chat/completions",
            base_url(config, self.default_base_url)
        );
        debug!(provider = %self.kind, model = %config.model, %url, "Sending chat completion request");

        let request = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(prompt, config));

        send_json::<ChatResponse>(request).await?.try_into()
    }
}
