//! OpenAI-style chat completions client with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::metrics::MetricsRegistry;

use super::llm::{GenerationParams, LlmProvider};

/// Rough token estimate used for usage accounting (~4 chars per token)
fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

/// Chat completions API client with automatic retry
pub struct OpenAiLlm {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
    /// API key resolved from the environment at construction
    api_key: String,
    /// Metrics sink
    metrics: Arc<MetricsRegistry>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiLlm {
    /// Create a new client, resolving the API key from the environment
    pub fn new(config: &LlmConfig, metrics: Arc<MetricsRegistry>) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "Missing required environment variable: {}",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            metrics,
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "LLM request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Send one chat request and return the first choice's content
    async fn send_chat(&self, request: &ChatRequest, timeout: Option<Duration>) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Completion request failed: {}", e)))?;

        if response.status().as_u16() == 429 {
            return Err(Error::Llm("rate limit exceeded".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Completion failed: HTTP {} - {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse completion response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("Completion returned no choices".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let start = Instant::now();
        let temperature = params.temperature.unwrap_or(self.config.temperature);

        let result = self
            .retry_request(|| {
                let request = ChatRequest {
                    model: self.config.model.clone(),
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt.to_string(),
                    }],
                    temperature,
                    max_tokens: params.max_tokens,
                    response_format: None,
                };

                async move { self.send_chat(&request, None).await }
            })
            .await;

        self.metrics.record_llm_call(result.is_ok());
        self.metrics.record_generation_time(start.elapsed());

        if let Ok(ref text) = result {
            self.metrics
                .record_token_usage(estimate_tokens(prompt), estimate_tokens(text));
        }

        result
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        // No retry here: the caller's time budget bounds the whole call and
        // structured checks are best-effort.
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.0,
            max_tokens: None,
            response_format: Some(serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "extraction",
                    "schema": schema,
                },
            })),
        };

        let start = Instant::now();
        let result = self.send_chat(&request, Some(timeout)).await;

        self.metrics.record_llm_call(result.is_ok());
        self.metrics.record_generation_time(start.elapsed());

        let content = result?;
        self.metrics
            .record_token_usage(estimate_tokens(prompt), estimate_tokens(&content));

        serde_json::from_str(&content)
            .map_err(|e| Error::Llm(format!("Structured output is not valid JSON: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}
