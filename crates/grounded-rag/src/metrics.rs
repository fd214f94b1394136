//! In-process metrics registry
//!
//! Counters and gauges are plain atomics owned by a single registry that is
//! constructed once at startup and handed to components as an `Arc`. The
//! registry only accumulates values; exporting them is left to whatever reads
//! the snapshot endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Central metrics registry
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests_ok: AtomicU64,
    requests_error: AtomicU64,
    llm_calls_ok: AtomicU64,
    llm_calls_error: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    retrievals: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    /// Last hallucination confidence in thousandths (gauge)
    hallucination_confidence_milli: AtomicU64,
    query_time_ms_total: AtomicU64,
    query_count: AtomicU64,
    generation_time_ms_total: AtomicU64,
    generation_count: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all values at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed query request
    pub fn record_request(&self, ok: bool) {
        if ok {
            self.requests_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an LLM API call
    pub fn record_llm_call(&self, ok: bool) {
        if ok {
            self.llm_calls_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.llm_calls_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a response cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a response cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retrieval operation
    pub fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record estimated token usage for one LLM call
    pub fn record_token_usage(&self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed);
    }

    /// Record the confidence of the most recent hallucination check
    pub fn record_hallucination_confidence(&self, confidence: f32) {
        let milli = (confidence.clamp(0.0, 1.0) * 1000.0) as u64;
        self.hallucination_confidence_milli
            .store(milli, Ordering::Relaxed);
    }

    /// Record total processing time of one query
    pub fn record_query_time(&self, elapsed: Duration) {
        self.query_time_ms_total
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        self.query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record latency of one generation call
    pub fn record_generation_time(&self, elapsed: Duration) {
        self.generation_time_ms_total
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        self.generation_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all values
    pub fn snapshot(&self) -> MetricsSnapshot {
        let query_count = self.query_count.load(Ordering::Relaxed);
        let generation_count = self.generation_count.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_ok: self.requests_ok.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            llm_calls_ok: self.llm_calls_ok.load(Ordering::Relaxed),
            llm_calls_error: self.llm_calls_error.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            retrievals: self.retrievals.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            hallucination_confidence: self.hallucination_confidence_milli.load(Ordering::Relaxed)
                as f64
                / 1000.0,
            avg_query_time_ms: avg(self.query_time_ms_total.load(Ordering::Relaxed), query_count),
            avg_generation_time_ms: avg(
                self.generation_time_ms_total.load(Ordering::Relaxed),
                generation_count,
            ),
        }
    }
}

fn avg(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Serializable point-in-time metrics view
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_ok: u64,
    pub requests_error: u64,
    pub llm_calls_ok: u64,
    pub llm_calls_error: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retrievals: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub hallucination_confidence: f64,
    pub avg_query_time_ms: f64,
    pub avg_generation_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.record_request(true);
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_token_usage(100, 40);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_ok, 2);
        assert_eq!(snap.requests_error, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.prompt_tokens, 100);
        assert_eq!(snap.completion_tokens, 40);
    }

    #[test]
    fn test_latency_average() {
        let metrics = MetricsRegistry::new();
        metrics.record_query_time(Duration::from_millis(100));
        metrics.record_query_time(Duration::from_millis(300));

        let snap = metrics.snapshot();
        assert!((snap.avg_query_time_ms - 200.0).abs() < f64::EPSILON);
        // No generation calls recorded yet
        assert_eq!(snap.avg_generation_time_ms, 0.0);
    }

    #[test]
    fn test_hallucination_gauge_clamped() {
        let metrics = MetricsRegistry::new();
        metrics.record_hallucination_confidence(1.7);
        assert!((metrics.snapshot().hallucination_confidence - 1.0).abs() < 1e-9);
    }
}
