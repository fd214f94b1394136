//! Retrieved passage types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A retrieved passage with source metadata
///
/// Ordering within a result set is significant (best-first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub content: String,
    /// Source identifier (file name or path)
    pub source: String,
    /// Page number within the source, when known
    #[serde(default)]
    pub page: Option<u32>,
    /// Channel relevance score, when the channel provides one
    #[serde(default)]
    pub score: Option<f32>,
}

impl Passage {
    /// Create a passage without page or score metadata
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            page: None,
            score: None,
        }
    }

    /// Set the page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the relevance score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Identity key used when merging ranked lists from different channels
    ///
    /// Two channels retrieving the same chunk report the same content and
    /// source, so the key is a digest over both plus the page.
    pub(crate) fn fusion_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.page.unwrap_or(0).to_le_bytes());
        hasher.update([0u8]);
        hasher.update(self.content.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

/// Ordered retrieval output with its formatted context
///
/// Created per query and discarded after the answer is produced. The
/// `retrieval_id` is a correlation token for logs only; it never participates
/// in cache lookups.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Retrieved passages, best-first
    pub passages: Vec<Passage>,
    /// Opaque correlation token, fresh per retrieval
    pub retrieval_id: Uuid,
    /// Source-tagged context string fed to generation
    pub context: String,
}
