//! Weighted fusion of the semantic and lexical retrieval channels

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{CorpusConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::metrics::MetricsRegistry;
use crate::providers::{GenerationParams, LlmProvider, SemanticSearchProvider};
use crate::types::{Passage, RetrievalResult};

use super::chunker::TextChunker;
use super::lexical::Bm25Index;

/// Sentinel the extraction prompt returns for irrelevant passages
const NO_OUTPUT: &str = "NO_OUTPUT";

/// Hybrid retriever combining semantic search with an in-process BM25 channel
///
/// The semantic channel is the one hard dependency: its failure aborts
/// retrieval. A missing lexical index degrades to semantic-only and a failing
/// reranker degrades to the un-reranked fused set, both logged as warnings.
pub struct FusionRetriever {
    semantic: Arc<dyn SemanticSearchProvider>,
    /// LLM used for contextual compression, when reranking is enabled
    llm: Option<Arc<dyn LlmProvider>>,
    /// Lexical index, swapped atomically by reference on corpus reload
    lexical: RwLock<Option<Arc<Bm25Index>>>,
    config: RetrievalConfig,
    corpus: CorpusConfig,
    metrics: Arc<MetricsRegistry>,
}

impl FusionRetriever {
    /// Create a new retriever
    pub fn new(
        semantic: Arc<dyn SemanticSearchProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
        config: RetrievalConfig,
        corpus: CorpusConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        tracing::info!(
            "Created retriever: hybrid_search={}, reranker={}",
            config.use_hybrid_search,
            config.use_reranker && llm.is_some()
        );

        Self {
            semantic,
            llm,
            lexical: RwLock::new(None),
            config,
            corpus,
            metrics,
        }
    }

    /// Load (or reload) the lexical corpus from a pre-chunked text file
    ///
    /// Chunks the file with the configured size/overlap, builds a fresh index
    /// and swaps it in whole; in-flight retrievals keep the index they
    /// already cloned. Returns the number of indexed chunks.
    pub async fn load_corpus(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Corpus(format!("Cannot read {}: {}", path.display(), e)))?;

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let chunker = TextChunker::new(self.corpus.chunk_size, self.corpus.chunk_overlap);
        let passages: Vec<Passage> = chunker
            .chunk(&text)
            .into_iter()
            .map(|content| Passage::new(content, source.clone()))
            .collect();

        let count = passages.len();
        let index = Bm25Index::build(passages);

        *self.lexical.write() = if index.is_empty() {
            tracing::warn!("Corpus {} produced no chunks, lexical channel disabled", source);
            None
        } else {
            Some(Arc::new(index))
        };

        tracing::info!("Loaded {} chunks from {} for lexical retrieval", count, source);
        Ok(count)
    }

    /// Number of chunks in the current lexical index
    pub fn lexical_len(&self) -> usize {
        self.lexical.read().as_ref().map(|ix| ix.len()).unwrap_or(0)
    }

    /// Retrieve a ranked passage set for the query
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let k = self.config.retrieval_k;

        let lexical = if self.config.use_hybrid_search {
            let index = self.lexical.read().clone();
            if index.is_none() {
                tracing::warn!("Lexical index not loaded, falling back to semantic-only retrieval");
            }
            index
        } else {
            None
        };

        // The channels are independent; issue them together and join.
        let (semantic_hits, lexical_hits) = tokio::join!(self.semantic.search(query, k), async {
            lexical.map(|ix| ix.search(query, k)).unwrap_or_default()
        });
        let semantic_hits = semantic_hits?;

        let fused = if lexical_hits.is_empty() {
            let mut hits = semantic_hits;
            hits.truncate(k);
            hits
        } else {
            fuse_weighted(
                semantic_hits,
                lexical_hits,
                self.config.vector_weight,
                self.config.lexical_weight,
                k,
            )
        };

        let passages = match (&self.llm, self.config.use_reranker) {
            (Some(llm), true) if !fused.is_empty() => {
                match self.rerank(llm.as_ref(), query, &fused).await {
                    Ok(reranked) => reranked,
                    Err(e) => {
                        tracing::warn!("Reranker failed ({}), using un-reranked results", e);
                        fused
                    }
                }
            }
            _ => fused,
        };

        let (context, retrieval_id) = format_retrieved_docs(&passages);
        self.metrics.record_retrieval();

        tracing::info!(
            "[{}] Retrieved {} passages for query: {:.50}",
            retrieval_id,
            passages.len(),
            query
        );

        Ok(RetrievalResult {
            passages,
            retrieval_id,
            context,
        })
    }

    /// Condense each passage to the parts relevant to the query
    ///
    /// Passages the model marks irrelevant are dropped; fused ordering is
    /// preserved for the survivors.
    async fn rerank(
        &self,
        llm: &dyn LlmProvider,
        query: &str,
        passages: &[Passage],
    ) -> Result<Vec<Passage>> {
        let params = GenerationParams::default();

        let extractions = futures::future::join_all(passages.iter().map(|passage| {
            let prompt = PromptBuilder::build_extract_prompt(query, &passage.content);
            let params = params.clone();
            async move { llm.complete(&prompt, &params).await }
        }))
        .await;

        let mut compressed = Vec::with_capacity(passages.len());
        for (passage, extraction) in passages.iter().zip(extractions) {
            let extracted = extraction?;
            let extracted = extracted.trim();
            if extracted.is_empty() || extracted == NO_OUTPUT {
                continue;
            }
            let mut condensed = passage.clone();
            condensed.content = extracted.to_string();
            compressed.push(condensed);
        }

        Ok(compressed)
    }
}

/// Merge two ranked lists by weighted, max-normalized score accumulation
///
/// A passage present in both channels accumulates both weighted
/// contributions; a passage present in one contributes only that channel's
/// term. Weights are applied as given. Channels that omit scores contribute
/// by reciprocal rank instead.
fn fuse_weighted(
    semantic: Vec<Passage>,
    lexical: Vec<Passage>,
    vector_weight: f32,
    lexical_weight: f32,
    k: usize,
) -> Vec<Passage> {
    struct Fused {
        passage: Passage,
        score: f32,
        order: usize,
    }

    let mut merged: HashMap<String, Fused> = HashMap::new();
    let mut order = 0usize;

    for (channel, weight) in [(semantic, vector_weight), (lexical, lexical_weight)] {
        let scores: Vec<f32> = channel
            .iter()
            .enumerate()
            .map(|(rank, p)| p.score.unwrap_or(1.0 / (rank as f32 + 1.0)))
            .collect();
        let max_score = scores.iter().cloned().fold(0.0f32, f32::max);

        for (passage, raw) in channel.into_iter().zip(scores) {
            let normalized = if max_score > 0.0 { raw / max_score } else { 0.0 };
            let contribution = weight * normalized;
            let key = passage.fusion_key();

            match merged.get_mut(&key) {
                Some(existing) => existing.score += contribution,
                None => {
                    merged.insert(
                        key,
                        Fused {
                            passage,
                            score: contribution,
                            order,
                        },
                    );
                    order += 1;
                }
            }
        }
    }

    let mut fused: Vec<Fused> = merged.into_values().collect();
    // Insertion order breaks score ties so results stay deterministic
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.order.cmp(&b.order))
    });
    fused.truncate(k);

    fused
        .into_iter()
        .map(|f| f.passage.with_score(f.score))
        .collect()
}

/// Format passages into a source-tagged context string
///
/// Deterministic apart from the fresh correlation id: passages numbered from
/// 1 in result order, tagged with available page/source metadata, separated
/// by blank lines.
pub fn format_retrieved_docs(passages: &[Passage]) -> (String, Uuid) {
    let retrieval_id = Uuid::new_v4();

    let mut formatted = String::new();
    for (i, passage) in passages.iter().enumerate() {
        let mut tag = format!("[Source {}", i + 1);
        if let Some(page) = passage.page {
            tag.push_str(&format!(", Page {}", page));
        }
        if !passage.source.is_empty() {
            let basename = passage.source.split('/').next_back().unwrap_or(&passage.source);
            tag.push_str(&format!(", {}", basename));
        }
        tag.push(']');

        formatted.push_str(&tag);
        formatted.push('\n');
        formatted.push_str(&passage.content);
        formatted.push_str("\n\n");
    }

    (formatted, retrieval_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorpusConfig, RetrievalConfig};
    use async_trait::async_trait;

    struct StubSearch {
        hits: Vec<Passage>,
        fail: bool,
    }

    #[async_trait]
    impl SemanticSearchProvider for StubSearch {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<Passage>> {
            if self.fail {
                return Err(Error::Retrieval("connection refused".to_string()));
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.fail)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn retriever(hits: Vec<Passage>, fail: bool) -> FusionRetriever {
        let mut config = RetrievalConfig::default();
        config.use_reranker = false;
        FusionRetriever::new(
            Arc::new(StubSearch { hits, fail }),
            None,
            config,
            CorpusConfig::default(),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[test]
    fn test_dual_channel_outranks_single_channel() {
        let shared = Passage::new("shared passage", "a.txt");
        let semantic_only = Passage::new("semantic passage", "b.txt");
        let lexical_only = Passage::new("lexical passage", "c.txt");

        let semantic = vec![
            shared.clone().with_score(0.9),
            semantic_only.clone().with_score(0.88),
        ];
        let lexical = vec![
            shared.clone().with_score(7.0),
            lexical_only.clone().with_score(6.9),
        ];

        let fused = fuse_weighted(semantic, lexical, 0.7, 0.3, 5);
        // Ranked #1 by both channels beats comparable single-channel passages
        assert_eq!(fused[0].content, "shared passage");
        assert!(fused[0].score.unwrap() > fused[1].score.unwrap());
    }

    #[test]
    fn test_single_channel_no_zero_fill_penalty() {
        let a = Passage::new("only semantic", "a.txt").with_score(1.0);
        let fused = fuse_weighted(vec![a], Vec::new(), 0.7, 0.3, 5);
        assert_eq!(fused.len(), 1);
        // Full weighted contribution of its one channel, nothing subtracted
        assert!((fused[0].score.unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_fusion_truncates_to_k() {
        let semantic: Vec<Passage> = (0..10)
            .map(|i| Passage::new(format!("passage {}", i), "a.txt").with_score(1.0 - i as f32 * 0.05))
            .collect();
        let fused = fuse_weighted(semantic, Vec::new(), 0.7, 0.3, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_format_numbers_and_tags() {
        let passages = vec![
            Passage::new("first content", "docs/report.pdf").with_page(3),
            Passage::new("second content", "notes.txt"),
        ];
        let (context, _) = format_retrieved_docs(&passages);
        assert!(context.contains("[Source 1, Page 3, report.pdf]\nfirst content"));
        assert!(context.contains("[Source 2, notes.txt]\nsecond content"));
        // Blank line between passages
        assert!(context.contains("first content\n\n[Source 2"));
    }

    #[test]
    fn test_format_fresh_retrieval_id() {
        let passages = vec![Passage::new("content", "a.txt")];
        let (_, id1) = format_retrieved_docs(&passages);
        let (_, id2) = format_retrieved_docs(&passages);
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn test_retrieve_degrades_without_lexical_index() {
        let hits = vec![Passage::new("semantic hit", "a.txt").with_score(0.8)];
        let retriever = retriever(hits, false);

        // Hybrid enabled but no corpus loaded: semantic-only, not an error
        let result = retriever.retrieve("question").await.unwrap();
        assert_eq!(result.passages.len(), 1);
        assert_eq!(result.passages[0].content, "semantic hit");
    }

    #[tokio::test]
    async fn test_retrieve_fails_when_semantic_channel_down() {
        let retriever = retriever(Vec::new(), true);
        let err = retriever.retrieve("question").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_retrieve_empty_results_is_valid() {
        let retriever = retriever(Vec::new(), false);
        let result = retriever.retrieve("question").await.unwrap();
        assert!(result.passages.is_empty());
        assert!(result.context.is_empty());
    }

    #[tokio::test]
    async fn test_corpus_swap_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("fusion-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chunks.txt");
        std::fs::write(&path, "solar panels convert sunlight. ".repeat(100)).unwrap();

        let retriever = retriever(Vec::new(), false);
        let first = retriever.load_corpus(&path).await.unwrap();
        let second = retriever.load_corpus(&path).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(retriever.lexical_len(), first);

        std::fs::remove_dir_all(&dir).ok();
    }
}
