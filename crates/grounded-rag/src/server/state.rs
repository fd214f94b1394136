//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::metrics::MetricsRegistry;
use crate::providers::{OpenAiLlm, RemoteSemanticSearch};
use crate::service::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The query service
    service: RagService,
    /// Metrics registry shared with all components
    metrics: Arc<MetricsRegistry>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state, wiring the concrete providers
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let metrics = Arc::new(MetricsRegistry::new());

        let llm = Arc::new(OpenAiLlm::new(&config.llm, Arc::clone(&metrics))?);
        tracing::info!("LLM client initialized (model: {})", config.llm.model);

        let semantic = Arc::new(RemoteSemanticSearch::new(&config.search)?);
        tracing::info!("Semantic search client initialized ({})", config.search.base_url);

        let service = RagService::new(&config, semantic, llm, Arc::clone(&metrics));

        let state = Self {
            inner: Arc::new(AppStateInner {
                config: config.clone(),
                service,
                metrics,
                ready: RwLock::new(false),
            }),
        };

        // Load the lexical corpus at startup when one is configured
        if let Some(ref path) = config.corpus.path {
            match state.service().load_corpus(path).await {
                Ok(count) => tracing::info!("Indexed {} corpus chunks from {}", count, path.display()),
                Err(e) => tracing::warn!("Could not load corpus {}: {}", path.display(), e),
            }
        }

        *state.inner.ready.write() = true;
        Ok(state)
    }

    /// Get the query service
    pub fn service(&self) -> &RagService {
        &self.inner.service
    }

    /// Get the metrics registry
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.inner.metrics
    }

    /// Get the configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Check if the service finished initializing
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }
}
