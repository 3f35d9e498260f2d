//! Chat-completion client for OpenAI-compatible providers (OpenRouter by default).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::InferenceConfig;
use crate::errors::InferenceError;
use crate::prompt::ChatRequest;

/// Provider error bodies are cut to this many characters before logging
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Sends a chat request and returns the top choice's text
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// HTTP client for `POST {api_base}/chat/completions`
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &InferenceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        debug!(model = %request.model, endpoint = %self.endpoint(), "Sending chat completion request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        parse_completion(&body)
    }
}

/// Extract the first choice's message content from a completion body
pub fn parse_completion(body: &str) -> Result<String, InferenceError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(InferenceError::EmptyAnswer);
    }
    Ok(content)
}

/// Wraps an inference client with a circuit breaker
pub struct GuardedInferenceClient<C> {
    inner: C,
    breaker: CircuitBreaker,
}

impl<C: InferenceClient> GuardedInferenceClient<C> {
    pub fn new(inner: C, breaker: CircuitBreaker) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl<C: InferenceClient> InferenceClient for GuardedInferenceClient<C> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        if self.breaker.is_open() {
            warn!("Circuit breaker open, skipping inference call");
            return Err(InferenceError::CircuitOpen);
        }

        match self.inner.complete(request).await {
            Ok(answer) => {
                self.breaker.record_success();
                Ok(answer)
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(
                    error = %e,
                    consecutive_failures = self.breaker.failure_count(),
                    "Inference call failed"
                );
                Err(e)
            }
        }
    }
}
