//! HTTP adapter for the external semantic search service

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::types::Passage;

use super::semantic::SemanticSearchProvider;

/// Client for a vector search service that embeds and searches server-side
///
/// The service exposes `POST /search` taking a query string and returning
/// ranked passages with similarity scores.
pub struct RemoteSemanticSearch {
    /// HTTP client
    client: Client,
    /// Configuration
    config: SearchConfig,
    /// Optional API key resolved from the environment
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    content: String,
    source: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    score: Option<f32>,
}

impl RemoteSemanticSearch {
    /// Create a new search client
    ///
    /// The API key is optional; local deployments commonly run without auth.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SemanticSearchProvider for RemoteSemanticSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let url = format!("{}/search", self.config.base_url);

        let mut builder = self.client.post(&url).json(&SearchRequest { query, top_k: k });
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Retrieval(format!("Search service unreachable: {}", e)))?;

        if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
            return Err(Error::Retrieval(format!(
                "Search service rejected credentials: HTTP {}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            return Err(Error::Retrieval(format!(
                "Search service error: HTTP {}",
                response.status()
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Retrieval(format!("Failed to parse search response: {}", e)))?;

        let passages = search_response
            .results
            .into_iter()
            .map(|hit| Passage {
                content: hit.content,
                source: hit.source,
                page: hit.page,
                score: hit.score,
            })
            .collect();

        Ok(passages)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "remote-search"
    }
}
