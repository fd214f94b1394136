//! Memoizing wrapper around an LLM provider

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::metrics::MetricsRegistry;
use crate::providers::{GenerationParams, LlmProvider};
use crate::types::CacheStats;

use super::lru::ResponseCache;

/// LLM provider that memoizes `complete` calls in an LRU cache
///
/// Identical prompt/parameter pairs return the cached text verbatim without
/// invoking the wrapped client. Structured calls pass through uncached: they
/// carry their own time budgets and their results feed validation rather
/// than user-visible output.
pub struct CachedLlm {
    inner: Arc<dyn LlmProvider>,
    cache: ResponseCache,
    metrics: Arc<MetricsRegistry>,
}

impl CachedLlm {
    /// Wrap a provider with a cache of `max_entries` responses
    pub fn new(
        inner: Arc<dyn LlmProvider>,
        max_entries: usize,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(max_entries),
            metrics,
        }
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl LlmProvider for CachedLlm {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let key = ResponseCache::key_for(prompt, params);

        if let Some(cached) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            tracing::debug!("Response cache hit: {}", &key[..12.min(key.len())]);
            return Ok(cached);
        }

        self.metrics.record_cache_miss();
        let response = self.inner.complete(prompt, params).await?;
        self.cache.insert(key, response.clone());

        Ok(response)
    }

    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        self.inner.complete_structured(prompt, schema, timeout).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
