//! End-to-end pipeline tests with stubbed external services

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use grounded_rag::config::RagConfig;
use grounded_rag::error::{Error, Result};
use grounded_rag::metrics::MetricsRegistry;
use grounded_rag::providers::{GenerationParams, LlmProvider, SemanticSearchProvider};
use grounded_rag::service::RagService;
use grounded_rag::types::Passage;

/// Semantic search stub returning a fixed passage list
struct StubSearch {
    passages: Vec<Passage>,
    fail: bool,
}

#[async_trait]
impl SemanticSearchProvider for StubSearch {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
        if self.fail {
            return Err(Error::Retrieval("search service unreachable".to_string()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "stub-search"
    }
}

/// LLM stub with a fixed completion and programmable structured output
struct StubLlm {
    answer: String,
    structured: Option<serde_json::Value>,
    structured_error: Option<String>,
    completions: AtomicU32,
}

impl StubLlm {
    fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            structured: None,
            structured_error: None,
            completions: AtomicU32::new(0),
        }
    }

    fn with_check(mut self, value: serde_json::Value) -> Self {
        self.structured = Some(value);
        self
    }

    fn with_check_error(mut self, message: &str) -> Self {
        self.structured_error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }

    async fn complete_structured(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<serde_json::Value> {
        if let Some(ref message) = self.structured_error {
            return Err(Error::Llm(message.clone()));
        }
        self.structured
            .clone()
            .ok_or_else(|| Error::Llm("no structured output configured".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub-llm"
    }
}

fn passages() -> Vec<Passage> {
    vec![
        Passage::new("The warranty period is two years.", "manual.pdf")
            .with_page(12)
            .with_score(0.92),
        Passage::new("Repairs are free during the warranty period.", "manual.pdf")
            .with_page(13)
            .with_score(0.85),
    ]
}

fn config(check_hallucinations: bool) -> RagConfig {
    let mut config = RagConfig::default();
    config.retrieval.use_reranker = false;
    config.validation.check_hallucinations = check_hallucinations;
    config
}

fn service(
    config: &RagConfig,
    search: StubSearch,
    llm: Arc<StubLlm>,
) -> RagService {
    RagService::new(
        config,
        Arc::new(search),
        llm,
        Arc::new(MetricsRegistry::new()),
    )
}

#[tokio::test]
async fn test_query_returns_cited_answer() {
    let llm = Arc::new(
        StubLlm::answering("The warranty lasts two years.\nSources:\n[Source 1, Page 12, manual.pdf]")
            .with_check(serde_json::json!({
                "is_hallucination": false,
                "confidence_score": 0.95,
                "reasoning": "Fully supported by the context",
                "verified_claims": ["warranty lasts two years"],
                "unverified_claims": [],
            })),
    );
    let service = service(
        &config(true),
        StubSearch {
            passages: passages(),
            fail: false,
        },
        llm,
    );

    let answer = service.query("How long is the warranty?").await;

    assert!(answer.error.is_none());
    assert!(answer.response.contains("two years"));
    assert_eq!(answer.passages.len(), 2);

    let validation = answer.validation.unwrap();
    assert!(validation.has_citations);

    let check = answer.hallucination_check.unwrap();
    assert!(!check.is_hallucination);
    assert!((check.confidence_score - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn test_low_confidence_substitutes_fallback() {
    let llm = Arc::new(
        StubLlm::answering("The warranty covers accidental damage too.\nSources:\n[Source 1]")
            .with_check(serde_json::json!({
                "is_hallucination": true,
                "confidence_score": 0.4,
                "reasoning": "Claims about accidental damage are not in the context",
                "verified_claims": [],
                "unverified_claims": ["covers accidental damage"],
            })),
    );
    let service = service(
        &config(true),
        StubSearch {
            passages: passages(),
            fail: false,
        },
        llm,
    );

    let question = "Does the warranty cover accidental damage?";
    let answer = service.query(question).await;

    // The generated answer is discarded for the templated refusal
    assert!(!answer.response.contains("accidental damage too"));
    assert!(answer.response.contains(question));
    assert!(answer.response.contains("40%"));
    assert!(answer.response.contains("not in the context"));

    let validation = answer.validation.unwrap();
    assert!(!validation.has_citations);
    assert_eq!(validation.warning.as_deref(), Some("Low confidence response"));
}

#[tokio::test]
async fn test_semantic_failure_yields_error_answer() {
    let llm = Arc::new(StubLlm::answering("unused"));
    let service = service(
        &config(false),
        StubSearch {
            passages: Vec::new(),
            fail: true,
        },
        llm,
    );

    let answer = service.query("Anything?").await;

    assert!(answer.error.is_some());
    assert!(answer.response.contains("reference:"));
    assert!(answer.response.contains(&answer.query_id.to_string()));
    assert!(answer.passages.is_empty());
    assert!(answer.validation.is_none());
}

#[tokio::test]
async fn test_inconclusive_check_still_answers() {
    let llm = Arc::new(
        StubLlm::answering("The warranty lasts two years.\nSources:\n[Source 1]")
            .with_check_error("rate limit exceeded"),
    );
    let service = service(
        &config(true),
        StubSearch {
            passages: passages(),
            fail: false,
        },
        llm,
    );

    let answer = service.query("How long is the warranty?").await;

    // Check failed, answer proceeds with citation-only validation
    assert!(answer.error.is_none());
    assert!(answer.hallucination_check.is_none());
    assert!(answer.validation.unwrap().has_citations);
}

#[tokio::test]
async fn test_empty_retrieval_is_answerable() {
    let llm = Arc::new(StubLlm::answering(
        "I don't have enough information to answer this question.",
    ));
    let service = service(
        &config(false),
        StubSearch {
            passages: Vec::new(),
            fail: false,
        },
        llm,
    );

    let answer = service.query("Unknown topic?").await;

    assert!(answer.error.is_none());
    assert!(answer.passages.is_empty());
    assert!(answer
        .response
        .contains("I don't have enough information"));
}

#[tokio::test]
async fn test_repeated_query_served_from_cache() {
    let llm = Arc::new(StubLlm::answering(
        "The warranty lasts two years.\nSources:\n[Source 1]",
    ));
    let service = service(
        &config(false),
        StubSearch {
            passages: passages(),
            fail: false,
        },
        Arc::clone(&llm),
    );

    let first = service.query("How long is the warranty?").await;
    let second = service.query("How long is the warranty?").await;

    assert_eq!(first.response, second.response);
    // One completion for two identical queries
    assert_eq!(llm.completions.load(Ordering::SeqCst), 1);

    let stats = service.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert!((stats.hit_rate - 0.5).abs() < 1e-9);
}
