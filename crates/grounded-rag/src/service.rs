//! Query orchestration: retrieve, generate, validate, fall back

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::cache::CachedLlm;
use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::metrics::MetricsRegistry;
use crate::providers::{GenerationParams, LlmProvider, SemanticSearchProvider};
use crate::retrieval::FusionRetriever;
use crate::types::{CacheStats, RagAnswer, ValidationInfo};
use crate::validation::ResponseValidator;

/// RAG query service
///
/// Each query runs one sequential chain: retrieval, generation, optional
/// hallucination check, validation, optional fallback substitution. Queries
/// are independent tasks bounded by a concurrency semaphore; the response
/// cache inside [`CachedLlm`] is the only state they share.
pub struct RagService {
    retriever: FusionRetriever,
    llm: Arc<CachedLlm>,
    validator: ResponseValidator,
    check_hallucinations: bool,
    semaphore: Semaphore,
    metrics: Arc<MetricsRegistry>,
}

impl RagService {
    /// Wire the pipeline from its providers
    pub fn new(
        config: &RagConfig,
        semantic: Arc<dyn SemanticSearchProvider>,
        llm: Arc<dyn LlmProvider>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let cached_llm = Arc::new(CachedLlm::new(
            llm,
            config.cache.max_entries,
            Arc::clone(&metrics),
        ));

        let reranker: Option<Arc<dyn LlmProvider>> = if config.retrieval.use_reranker {
            Some(cached_llm.clone() as Arc<dyn LlmProvider>)
        } else {
            None
        };

        let retriever = FusionRetriever::new(
            semantic,
            reranker,
            config.retrieval.clone(),
            config.corpus.clone(),
            Arc::clone(&metrics),
        );

        let validator = ResponseValidator::new(
            cached_llm.clone() as Arc<dyn LlmProvider>,
            config.validation.clone(),
            Arc::clone(&metrics),
        );

        tracing::info!(
            "Initialized RAG service: hybrid_search={}, reranker={}, hallucination_check={}",
            config.retrieval.use_hybrid_search,
            config.retrieval.use_reranker,
            config.validation.check_hallucinations
        );

        Self {
            retriever,
            llm: cached_llm,
            validator,
            check_hallucinations: config.validation.check_hallucinations,
            semaphore: Semaphore::new(config.server.max_concurrent_queries.max(1)),
            metrics,
        }
    }

    /// Answer a question over the indexed corpus
    ///
    /// Always returns an answer aggregate: unrecoverable failures become an
    /// error-shaped [`RagAnswer`] with a safe message and correlation id,
    /// never a raised error.
    pub async fn query(&self, question: &str) -> RagAnswer {
        let start = Instant::now();
        let query_id = Uuid::new_v4();

        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                // Semaphore closed only on shutdown
                return RagAnswer::from_error(
                    query_id,
                    question,
                    "service shutting down",
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        match self.run_query(query_id, question).await {
            Ok(mut answer) => {
                answer.processing_time_ms = start.elapsed().as_millis() as u64;
                self.metrics.record_request(true);
                self.metrics.record_query_time(start.elapsed());
                answer
            }
            Err(e) => {
                tracing::error!("[{}] Error processing query: {}", query_id, e);
                self.metrics.record_request(false);
                self.metrics.record_query_time(start.elapsed());
                RagAnswer::from_error(query_id, question, e, start.elapsed().as_millis() as u64)
            }
        }
    }

    async fn run_query(&self, query_id: Uuid, question: &str) -> Result<RagAnswer> {
        // Retrieving
        tracing::info!("[{}] Retrieving documents for query: {:.50}", query_id, question);
        let retrieval = self.retriever.retrieve(question).await?;

        // Generating. An empty passage set yields an empty context, which is
        // still valid generation input.
        tracing::info!("[{}] Generating response...", query_id);
        let prompt = PromptBuilder::build_rag_prompt(question, &retrieval.context);
        let response = self
            .llm
            .complete(&prompt, &GenerationParams::default())
            .await?;

        // CheckingHallucination
        let check = if self.check_hallucinations {
            tracing::info!("[{}] Checking for hallucinations...", query_id);
            self.validator
                .check_hallucination(&response, &retrieval.context, question)
                .await
        } else {
            None
        };

        // Validating, with fallback substitution on low confidence
        let (final_response, validation) = match &check {
            Some(result) => {
                let (validated, info) = self.validator.validate_response(
                    &response,
                    &retrieval.context,
                    question,
                    Some(result),
                );

                if result.confidence_score < self.validator.confidence_threshold() {
                    tracing::warn!(
                        "[{}] Low confidence ({}) below threshold ({}), using fallback",
                        query_id,
                        result.confidence_score,
                        self.validator.confidence_threshold()
                    );
                    let fallback = self.validator.fallback_response(
                        question,
                        result.confidence_score,
                        &result.reasoning,
                    );
                    let info = ValidationInfo {
                        has_citations: false,
                        warning: Some("Low confidence response".to_string()),
                        hallucination_check: Some(result.summary()),
                        ..Default::default()
                    };
                    (fallback, info)
                } else {
                    (validated, info)
                }
            }
            None => {
                self.validator
                    .validate_response(&response, &retrieval.context, question, None)
            }
        };

        Ok(RagAnswer {
            query_id,
            question: question.to_string(),
            response: final_response,
            passages: retrieval.passages,
            validation: Some(validation),
            hallucination_check: check,
            created_at: chrono::Utc::now(),
            processing_time_ms: 0, // Stamped by the caller
            error: None,
        })
    }

    /// (Re)build the lexical index from a pre-chunked corpus file
    pub async fn load_corpus(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.retriever.load_corpus(path).await
    }

    /// Response cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.llm.cache_stats()
    }

    /// Clear the response cache
    pub fn clear_cache(&self) {
        self.llm.clear_cache();
    }
}
