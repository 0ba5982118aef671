//! Google Gemini `generateContent` adapter

use super::{base_url, require_credential, send_json};
use async_trait::async_trait;
use delib_application::{Completion, ProviderAdapter, ProviderError};
use delib_domain::{ModelConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Calls `POST {base}/models/{model}:generateContent`; the key travels as a
/// query parameter
pub struct GoogleAdapter {
    client: reqwest::Client,
}

impl GoogleAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, config: &ModelConfig) -> Self {
        Self {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u32,
}

impl TryFrom<GenerateResponse> for Completion {
    type Error = ProviderError;

    fn try_from(response: GenerateResponse) -> Result<Self, Self::Error> {
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| ProviderError::InvalidResponse("no candidate text".into()))?;
        let tokens = response.usage_metadata.map_or(0, |u| u.total_token_count);
        Ok(Completion::new(text, tokens))
    }
}

fn endpoint(config: &ModelConfig) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url(config, DEFAULT_BASE_URL),
        config.model
    )
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn send(&self, prompt: &str, config: &ModelConfig) -> Result<Completion, ProviderError> {
        let api_key = require_credential(config)?;
        let url = endpoint(config);
        debug!(model = %config.model, %url, "Sending Gemini request");

        let request = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&GenerateRequest::new(prompt, config));

        send_json::<GenerateResponse>(request).await?.try_into()
    }
}
