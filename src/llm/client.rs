use crate::config::Config;
use crate::constants;
use crate::error::ProviderError;
use crate::llm::{ChatBackend, CompletionRequest, OpenAiBackend, RetryPolicy, Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::Duration;

/// Retrying text-completion client.
///
/// Without a backend the client is disabled: every call succeeds with an
/// empty string so uploads keep working when no credential is configured.
pub struct TextGenerationClient {
    backend: Option<Arc<dyn ChatBackend>>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    request_timeout: Duration,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl TextGenerationClient {
    /// Create an enabled client with default generation parameters
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::disabled()
        }
    }

    /// Create a client that returns empty completions without calling out
    pub fn disabled() -> Self {
        Self {
            backend: None,
            model: constants::DEFAULT_MODEL.to_string(),
            temperature: constants::DEFAULT_TEMPERATURE,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(constants::DEFAULT_REQUEST_TIMEOUT_SECS),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Build from configuration. Disabled when no API key is available.
    pub fn from_config(config: &Config) -> Self {
        let provider = &config.provider;
        let client = match config.provider_api_key() {
            Some(key) => Self::new(Arc::new(OpenAiBackend::new(&provider.base_url, &key))),
            None => {
                tracing::info!(
                    "No provider API key configured ({} unset); metadata generation disabled",
                    constants::API_KEY_ENV
                );
                Self::disabled()
            }
        };

        client
            .with_model(provider.model.clone())
            .with_temperature(provider.temperature)
            .with_max_tokens(provider.max_tokens)
            .with_request_timeout(provider.request_timeout())
            .with_retry_policy(RetryPolicy::new(
                provider.retry_limit,
                provider.base_delay(),
                provider.max_delay(),
            ))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Complete a prompt, retrying transient failures with exponential backoff
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let Some(backend) = &self.backend else {
            return Ok(String::new());
        };

        let request = CompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            prompt: prompt.to_string(),
        };
        let attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.request_timeout, backend.send(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Transient(format!(
                    "request timed out after {} ms",
                    self.request_timeout.as_millis()
                ))),
            };

            match result {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Provider call succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) if !err.is_transient() => {
                    tracing::warn!(attempt, error = %err, "Provider call failed, not retrying");
                    return Err(err);
                }
                Err(err) if attempt >= attempts => {
                    tracing::warn!(attempt, error = %err, "Provider call failed, retries exhausted");
                    return Err(ProviderError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient provider failure, will retry after backoff"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of results and records every request
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Fatal("script exhausted".to_string())))
        }
    }

    struct SlowBackend;

    #[async_trait::async_trait]
    impl ChatBackend for SlowBackend {
        async fn send(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn transient() -> Result<String, ProviderError> {
        Err(ProviderError::Transient("503 Service Unavailable".to_string()))
    }

    #[tokio::test]
    async fn test_disabled_client_returns_empty() {
        let client = TextGenerationClient::disabled();
        assert!(!client.is_enabled());
        assert_eq!(client.complete("anything").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_succeeds_after_two_transient_failures() {
        let backend = ScriptedBackend::new(vec![transient(), transient(), Ok("Sunset".to_string())]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(backend.clone())
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(10)))
            .with_sleeper(sleeper.clone());

        let text = client.complete("title please").await.unwrap();

        assert_eq!(text, "Sunset");
        assert_eq!(backend.calls(), 3);
        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays, vec![Duration::from_millis(100), Duration::from_millis(200)]);
        assert_eq!(delays.iter().sum::<Duration>(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let backend = ScriptedBackend::new(vec![transient(), transient(), transient(), Ok("unused".to_string())]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(backend.clone()).with_sleeper(sleeper.clone());

        let err = client.complete("title please").await.unwrap_err();

        assert!(matches!(err, ProviderError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(backend.calls(), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_fails_fast() {
        let backend = ScriptedBackend::new(vec![
            Err(ProviderError::Fatal("401 invalid api key".to_string())),
            Ok("unused".to_string()),
        ]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(backend.clone()).with_sleeper(sleeper.clone());

        let err = client.complete("title please").await.unwrap_err();

        assert!(matches!(err, ProviderError::Fatal(_)));
        assert_eq!(backend.calls(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backoff_is_capped() {
        let backend = ScriptedBackend::new(vec![transient(), transient(), transient(), transient(), Ok("ok".to_string())]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(backend)
            .with_retry_policy(RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(3)))
            .with_sleeper(sleeper.clone());

        assert_eq!(client.complete("p").await.unwrap(), "ok");
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(3),
            ]
        );
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = TextGenerationClient::new(Arc::new(SlowBackend))
            .with_request_timeout(Duration::from_millis(10))
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1)))
            .with_sleeper(sleeper.clone());

        let err = client.complete("p").await.unwrap_err();

        match err {
            ProviderError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(source.to_string().contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_generation_parameters() {
        let backend = ScriptedBackend::new(vec![Ok("ok".to_string())]);
        let client = TextGenerationClient::new(backend.clone())
            .with_model("gpt-4o-mini")
            .with_temperature(0.1)
            .with_max_tokens(64);

        client.complete("describe sunset-beach.jpg").await.unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].temperature, 0.1);
        assert_eq!(requests[0].max_tokens, 64);
        assert_eq!(requests[0].prompt, "describe sunset-beach.jpg");
    }

    #[test]
    fn test_from_config_without_key_is_disabled() {
        let mut config = Config::default();
        config.provider.api_key = Some(String::new());
        // An empty configured key shadows the environment variable
        let client = TextGenerationClient::from_config(&config);
        assert!(!client.is_enabled());
    }

    #[test]
    fn test_from_config_with_key_is_enabled() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-test".to_string());
        config.provider.retry_limit = 5;
        let client = TextGenerationClient::from_config(&config);
        assert!(client.is_enabled());
        assert_eq!(client.policy.attempts(), 5);
    }
}
