//! Anthropic Messages API adapter

use super::{base_url, require_credential, send_json};
use async_trait::async_trait;
use delib_application::{Completion, ProviderAdapter, ProviderError};
use delib_domain::{ModelConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

/// Calls `POST {base}/v1/messages` with `x-api-key` authentication
pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    fn new(prompt: &'a str, config: &'a ModelConfig) -> Self {
        Self {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl TryFrom<MessagesResponse> for Completion {
    type Error = ProviderError;

    fn try_from(response: MessagesResponse) -> Result<Self, Self::Error> {
        let text = response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| ProviderError::InvalidResponse("no text content block".into()))?;
        let tokens = response
            .usage
            .input_tokens
            .saturating_add(response.usage.output_tokens);
        Ok(Completion::new(text, tokens))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn send(&self, prompt: &str, config: &ModelConfig) -> Result<Completion, ProviderError> {
        let api_key = require_credential(config)?;
        let url = format!("{}/v1/messages", base_url(config, DEFAULT_BASE_URL));
        debug!(model = %config.model, %url, "Sending Anthropic request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&MessagesRequest::new(prompt, config));

        send_json::<MessagesResponse>(request).await?.try_into()
    }
}
