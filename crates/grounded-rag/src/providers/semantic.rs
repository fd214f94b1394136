//! Semantic search provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Passage;

/// Trait for embedding-similarity search over the document corpus
///
/// The service owns embedding computation and vector search; callers hand it
/// a query string and receive ranked passages. Connectivity and auth failures
/// must surface as `Error::Retrieval` so the orchestrator can distinguish the
/// one hard dependency of answering from degradable sub-failures.
#[async_trait]
pub trait SemanticSearchProvider: Send + Sync {
    /// Top-k passages by embedding similarity, best-first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>>;

    /// Check if the service is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
