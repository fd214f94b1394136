//! LLM provider trait for text generation and structured extraction

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Generation parameters passed alongside a prompt
///
/// Participates in cache keys via [`GenerationParams::sorted_pairs`], which
/// yields a canonical name-sorted representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature override
    pub temperature: Option<f32>,
    /// Completion length cap
    pub max_tokens: Option<u32>,
}

impl GenerationParams {
    /// Canonical (name, value) pairs in sorted name order
    pub fn sorted_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(m) = self.max_tokens {
            pairs.push(("max_tokens", m.to_string()));
        }
        if let Some(t) = self.temperature {
            pairs.push(("temperature", format!("{}", t)));
        }
        pairs.sort_by_key(|(name, _)| *name);
        pairs
    }
}

/// Trait for LLM text completion
///
/// Implementations:
/// - `OpenAiLlm`: OpenAI-style chat completions API
/// - `CachedLlm`: memoizing wrapper around any other implementation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate free-form text for a prompt
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Request a JSON object matching `schema`, bounded by `timeout`
    ///
    /// Used for extraction tasks where the response must be machine-readable.
    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
