//! Model router
//!
//! Routes a prompt to one participant (or fans it out to several), wrapping
//! it with the governance preamble and retrying transient provider failures.

use crate::config::RetryPolicy;
use crate::ports::provider::{ProviderError, ProviderRegistry};
use delib_domain::{
    DeliberationContext, GovernancePreamble, ModelConfig, ModelResponse, ProviderKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that can occur while routing a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("No adapter registered for provider {provider} (participant {participant})")]
    UnknownProvider {
        participant: String,
        provider: ProviderKind,
    },

    #[error("Missing credential for participant {participant} ({provider})")]
    MissingCredential {
        participant: String,
        provider: ProviderKind,
    },

    #[error("Participant {participant} failed after {attempts} attempt(s): {source}")]
    Provider {
        participant: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },
}

impl RouterError {
    /// Configuration errors fail fast and are never retried
    pub fn is_configuration(&self) -> bool {
        !matches!(self, RouterError::Provider { .. })
    }
}

/// Stateless dispatcher from participant ids to provider adapters.
///
/// Cheap to clone; clones share the participant table and adapters.
#[derive(Clone)]
pub struct ModelRouter {
    participants: Arc<HashMap<String, ModelConfig>>,
    registry: Arc<ProviderRegistry>,
    preamble: Arc<GovernancePreamble>,
    retry: RetryPolicy,
}

impl ModelRouter {
    pub fn new(
        participants: HashMap<String, ModelConfig>,
        registry: ProviderRegistry,
        preamble: GovernancePreamble,
    ) -> Self {
        Self {
            participants: Arc::new(participants),
            registry: Arc::new(registry),
            preamble: Arc::new(preamble),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn preamble(&self) -> &GovernancePreamble {
        &self.preamble
    }

    pub fn is_known(&self, participant_id: &str) -> bool {
        self.participants.contains_key(participant_id)
    }

    /// Configured participant ids, sorted
    pub fn participant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.participants.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn participant(&self, participant_id: &str) -> Option<&ModelConfig> {
        self.participants.get(participant_id)
    }

    /// Query one participant.
    ///
    /// Configuration errors are returned before any network call. Provider
    /// failures are retried per the [`RetryPolicy`]; the last error is returned.
    pub async fn query(
        &self,
        participant_id: &str,
        prompt: &str,
        context: Option<&DeliberationContext>,
    ) -> Result<ModelResponse, RouterError> {
        let config = self
            .participants
            .get(participant_id)
            .ok_or_else(|| RouterError::UnknownParticipant(participant_id.to_string()))?;

        let adapter = self
            .registry
            .get(config.provider)
            .ok_or_else(|| RouterError::UnknownProvider {
                participant: participant_id.to_string(),
                provider: config.provider,
            })?;

        if config.credential().is_none() {
            return Err(RouterError::MissingCredential {
                participant: participant_id.to_string(),
                provider: config.provider,
            });
        }

        let wrapped = self.preamble.wrap(prompt, context);

        let mut attempt = 0;
        loop {
            let started = Instant::now();
            match adapter.send(&wrapped, config).await {
                Ok(completion) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    debug!(
                        "Participant {} answered in {}ms ({} tokens)",
                        participant_id, latency_ms, completion.tokens
                    );
                    return Ok(ModelResponse::new(
                        participant_id,
                        config.model.clone(),
                        completion.text,
                    )
                    .with_tokens(completion.tokens)
                    .with_latency_ms(latency_ms));
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Participant {} attempt {}/{} failed: {}; retrying in {:?}",
                        participant_id,
                        attempt + 1,
                        self.retry.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(RouterError::Provider {
                        participant: participant_id.to_string(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }

    /// Query several participants concurrently, keeping every outcome.
    ///
    /// Results are in the order of `participant_ids`.
    pub async fn query_each(
        &self,
        prompt: &str,
        participant_ids: &[String],
        context: Option<&DeliberationContext>,
    ) -> Vec<(String, Result<ModelResponse, RouterError>)> {
        let prompt: Arc<str> = Arc::from(prompt);
        let context = context.cloned().map(Arc::new);
        let mut join_set = JoinSet::new();

        for (index, participant_id) in participant_ids.iter().enumerate() {
            let router = self.clone();
            let prompt = Arc::clone(&prompt);
            let context = context.clone();
            let participant_id = participant_id.clone();

            join_set.spawn(async move {
                let result = router
                    .query(&participant_id, &prompt, context.as_deref())
                    .await;
                (index, participant_id, result)
            });
        }

        let mut outcomes = Vec::with_capacity(participant_ids.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, participant_id, result)) => {
                    match &result {
                        Ok(_) => info!("Participant {} responded successfully", participant_id),
                        Err(e) => warn!("Participant {} failed: {}", participant_id, e),
                    }
                    outcomes.push((index, participant_id, result));
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        outcomes.sort_by_key(|(index, _, _)| *index);
        outcomes
            .into_iter()
            .map(|(_, participant_id, result)| (participant_id, result))
            .collect()
    }

    /// Query several participants concurrently; failed participants are
    /// left out of the result.
    pub async fn query_all(
        &self,
        prompt: &str,
        participant_ids: &[String],
        context: Option<&DeliberationContext>,
    ) -> Vec<ModelResponse> {
        self.query_each(prompt, participant_ids, context)
            .await
            .into_iter()
            .filter_map(|(_, result)| result.ok())
            .collect()
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("participants", &self.participant_ids())
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider adapter shared by use case tests.

    use crate::ports::provider::{Completion, ProviderAdapter, ProviderError, ProviderRegistry};
    use async_trait::async_trait;
    use delib_domain::{ModelConfig, ProviderKind};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted reply: optional delay, then text or error
    #[derive(Clone)]
    pub struct Reply {
        pub delay: Duration,
        pub result: Result<String, ProviderError>,
    }

    impl Reply {
        pub fn text(text: &str) -> Self {
            Self {
                delay: Duration::ZERO,
                result: Ok(text.to_string()),
            }
        }

        pub fn error(error: ProviderError) -> Self {
            Self {
                delay: Duration::ZERO,
                result: Err(error),
            }
        }

        pub fn after(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    /// Adapter that replays scripted replies keyed by model name.
    ///
    /// When a script runs out, the last reply repeats.
    pub struct ScriptedAdapter {
        kind: ProviderKind,
        scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedAdapter {
        pub fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                scripts: Mutex::new(HashMap::new()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn script(self, model: &str, replies: Vec<Reply>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(model.to_string(), replies.into());
            self
        }

        pub fn calls_for(&self, model: &str) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == model)
                .count()
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn send(
            &self,
            prompt: &str,
            config: &ModelConfig,
        ) -> Result<Completion, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push((config.model.clone(), prompt.to_string()));

            let reply = {
                let mut scripts = self.scripts.lock().unwrap();
                let queue = scripts
                    .get_mut(&config.model)
                    .expect("no script for model");
                if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap()
                }
            };

            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result.map(|text| Completion::new(text, 42))
        }
    }

    /// Participants "<model>" served by the given adapter's provider
    pub fn participants(kind: ProviderKind, models: &[&str]) -> HashMap<String, ModelConfig> {
        models
            .iter()
            .map(|m| {
                (
                    m.to_string(),
                    ModelConfig::new(kind, *m).with_api_key("test-key"),
                )
            })
            .collect()
    }

    pub fn registry(adapter: std::sync::Arc<ScriptedAdapter>) -> ProviderRegistry {
        ProviderRegistry::new().with(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use delib_domain::PREVIOUS_RESPONSES_KEY;
    use std::time::Duration;

    fn router(adapter: Arc<ScriptedAdapter>, models: &[&str]) -> ModelRouter {
        ModelRouter::new(
            participants(ProviderKind::Anthropic, models),
            registry(adapter),
            GovernancePreamble::default(),
        )
    }

    fn transient() -> ProviderError {
        ProviderError::Status {
            status: 529,
            body: "overloaded".into(),
        }
    }

    #[tokio::test]
    async fn test_query_wraps_prompt() {
        let adapter = Arc::new(
            ScriptedAdapter::new(ProviderKind::Anthropic).script("claude", vec![Reply::text("I agree")]),
        );
        let router = router(Arc::clone(&adapter), &["claude"]);

        let mut context = DeliberationContext::new();
        context.insert(PREVIOUS_RESPONSES_KEY.into(), "gpt4: approve".into());
        let response = router.query("claude", "Ship it?", Some(&context)).await.unwrap();

        assert_eq!(response.participant_id, "claude");
        assert_eq!(response.model, "claude");
        assert_eq!(response.content, "I agree");
        assert_eq!(response.tokens, 42);

        let prompts = adapter.prompts.lock().unwrap();
        let sent = &prompts[0].1;
        assert!(sent.contains("CONSTITUTION"));
        assert!(sent.contains("PREVIOUS RESPONSES:\ngpt4: approve"));
        assert!(sent.contains("QUESTION:\nShip it?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_then_success() {
        let adapter = Arc::new(ScriptedAdapter::new(ProviderKind::Anthropic).script(
            "claude",
            vec![
                Reply::error(transient()),
                Reply::error(transient()),
                Reply::text("ok"),
            ],
        ));
        let router = router(Arc::clone(&adapter), &["claude"]);

        let start = Instant::now();
        let response = router.query("claude", "q", None).await.unwrap();

        assert_eq!(response.content, "ok");
        assert_eq!(adapter.calls_for("claude"), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_error_propagates() {
        let adapter = Arc::new(
            ScriptedAdapter::new(ProviderKind::Anthropic)
                .script("claude", vec![Reply::error(ProviderError::Timeout)]),
        );
        let router = router(Arc::clone(&adapter), &["claude"]);

        let err = router.query("claude", "q", None).await.unwrap_err();
        assert_eq!(
            err,
            RouterError::Provider {
                participant: "claude".into(),
                attempts: 3,
                source: ProviderError::Timeout,
            }
        );
        assert_eq!(adapter.calls_for("claude"), 3);
        assert!(!err.is_configuration());
    }

    #[tokio::test]
    async fn test_configuration_errors_fail_fast() {
        let adapter = Arc::new(
            ScriptedAdapter::new(ProviderKind::Anthropic).script("claude", vec![Reply::text("x")]),
        );
        let mut models = participants(ProviderKind::Anthropic, &["claude"]);
        models.insert(
            "nokey".into(),
            ModelConfig::new(ProviderKind::Anthropic, "nokey"),
        );
        models.insert(
            "gemini".into(),
            ModelConfig::new(ProviderKind::Google, "gemini").with_api_key("k"),
        );
        let router = ModelRouter::new(models, registry(Arc::clone(&adapter)), GovernancePreamble::default());

        assert!(matches!(
            router.query("mistral", "q", None).await,
            Err(RouterError::UnknownParticipant(id)) if id == "mistral"
        ));
        assert!(matches!(
            router.query("nokey", "q", None).await,
            Err(RouterError::MissingCredential { .. })
        ));
        assert!(matches!(
            router.query("gemini", "q", None).await,
            Err(RouterError::UnknownProvider { provider: ProviderKind::Google, .. })
        ));
        assert_eq!(adapter.prompts.lock().unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_from_adapter_is_not_retried() {
        let adapter = Arc::new(ScriptedAdapter::new(ProviderKind::Anthropic).script(
            "claude",
            vec![Reply::error(ProviderError::MissingCredential(ProviderKind::Anthropic))],
        ));
        let router = router(Arc::clone(&adapter), &["claude"]);

        let err = router.query("claude", "q", None).await.unwrap_err();
        assert!(matches!(err, RouterError::Provider { attempts: 1, .. }));
        assert_eq!(adapter.calls_for("claude"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_all_preserves_order_and_drops_failures() {
        let adapter = Arc::new(
            ScriptedAdapter::new(ProviderKind::Anthropic)
                .script("a", vec![Reply::text("first").after(Duration::from_secs(5))])
                .script("b", vec![Reply::error(ProviderError::Timeout)])
                .script("c", vec![Reply::text("third")]),
        );
        let router = router(adapter, &["a", "b", "c"]);
        let ids: Vec<String> = vec!["a".into(), "b".into(), "c".into()];

        let responses = router.query_all("q", &ids, None).await;
        let order: Vec<&str> = responses.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(order, vec!["a", "c"]);

        let outcomes = router.query_each("q", &ids, None).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1].0, "b");
        assert!(outcomes[1].1.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_all_runs_concurrently() {
        let adapter = Arc::new(
            ScriptedAdapter::new(ProviderKind::Anthropic)
                .script("a", vec![Reply::text("x").after(Duration::from_secs(10))])
                .script("b", vec![Reply::text("y").after(Duration::from_secs(10))]),
        );
        let router = router(adapter, &["a", "b"]);

        let start = Instant::now();
        let responses = router
            .query_all("q", &["a".to_string(), "b".to_string()], None)
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
