//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// LLM client configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Semantic search service configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Retrieval fusion configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Response validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Lexical corpus configuration
    #[serde(default)]
    pub corpus: CorpusConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Build configuration from defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env_parse("LLM_TEMPERATURE") {
            self.llm.temperature = v;
        }
        if let Ok(v) = std::env::var("SEARCH_BASE_URL") {
            self.search.base_url = v;
        }
        if let Some(v) = env_parse("RETRIEVAL_K") {
            self.retrieval.retrieval_k = v;
        }
        if let Some(v) = env_flag("USE_HYBRID_SEARCH") {
            self.retrieval.use_hybrid_search = v;
        }
        if let Some(v) = env_flag("RERANKER_ENABLED") {
            self.retrieval.use_reranker = v;
        }
        if let Some(v) = env_flag("HALLUCINATION_CHECK_ENABLED") {
            self.validation.check_hallucinations = v;
        }
        if let Some(v) = env_parse("CACHE_MAX_ENTRIES") {
            self.cache.max_entries = v;
        }
        if let Some(v) = env_parse("MAX_CONCURRENT_QUERIES") {
            self.server.max_concurrent_queries = v;
        }
        if let Ok(v) = std::env::var("CORPUS_PATH") {
            self.corpus.path = Some(PathBuf::from(v));
        }
    }

    /// Check that the API key environment variables named by the config are set
    ///
    /// The search service key is optional (local deployments run without auth).
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(Error::Config(format!(
                "Missing required environment variable: {} (LLM API key)",
                self.llm.api_key_env
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v.to_lowercase() == "true")
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum queries processed concurrently
    pub max_concurrent_queries: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_concurrent_queries: 10,
        }
    }
}

/// LLM client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Completion API base URL
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0, // Deterministic answers for grounded Q&A
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Semantic search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search service base URL
    pub base_url: String,
    /// Environment variable holding the API key (optional for local services)
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            api_key_env: "SEARCH_API_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Retrieval fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages each channel retrieves and fusion returns
    pub retrieval_k: usize,
    /// Fuse the lexical channel with semantic search when an index is loaded
    pub use_hybrid_search: bool,
    /// Pass the fused set through LLM-based contextual compression
    pub use_reranker: bool,
    /// Weight of the semantic channel in fusion
    pub vector_weight: f32,
    /// Weight of the lexical channel in fusion
    pub lexical_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 5,
            use_hybrid_search: true,
            use_reranker: true,
            vector_weight: 0.7,
            lexical_weight: 0.3,
        }
    }
}

/// Response validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run the LLM hallucination check after generation
    pub check_hallucinations: bool,
    /// Confidence below this substitutes the fallback response
    pub confidence_threshold: f32,
    /// Base hallucination-check timeout in seconds
    pub base_timeout_secs: u64,
    /// Upper bound on the adaptive timeout in seconds
    pub max_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_hallucinations: true,
            confidence_threshold: 0.6,
            base_timeout_secs: 5,
            max_timeout_secs: 30,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached responses
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

/// Lexical corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Pre-chunked corpus text file loaded at startup (optional)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.retrieval.retrieval_k, 5);
        assert!((config.retrieval.vector_weight - 0.7).abs() < f32::EPSILON);
        assert!((config.validation.confidence_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.corpus.chunk_size, 1000);
        assert_eq!(config.corpus.chunk_overlap, 200);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            [retrieval]
            retrieval_k = 8
            use_hybrid_search = false
            use_reranker = false
            vector_weight = 0.5
            lexical_weight = 0.5

            [cache]
            max_entries = 32
        "#;
        let config: RagConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retrieval.retrieval_k, 8);
        assert!(!config.retrieval.use_hybrid_search);
        assert_eq!(config.cache.max_entries, 32);
        // Sections not present fall back to defaults
        assert_eq!(config.server.port, 8080);
    }
}
