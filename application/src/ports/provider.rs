//! Provider adapter port
//!
//! Defines the interface for sending a prompt to one LLM provider API.

use async_trait::async_trait;
use delib_domain::{ModelConfig, ProviderKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while calling a provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Missing credential for provider {0}")]
    MissingCredential(ProviderKind),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

impl ProviderError {
    /// Configuration problems are never retried
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::MissingCredential(_))
    }
}

/// Text and token usage returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens: u32,
}

impl Completion {
    pub fn new(text: impl Into<String>, tokens: u32) -> Self {
        Self {
            text: text.into(),
            tokens,
        }
    }
}

/// Adapter for one provider API family.
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider family this adapter serves
    fn kind(&self) -> ProviderKind;

    /// Send a fully wrapped prompt and return the completion
    async fn send(&self, prompt: &str, config: &ModelConfig) -> Result<Completion, ProviderError>;
}

/// Maps provider kinds to their adapters
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
