//! LRU response cache keyed by prompt digest

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::providers::GenerationParams;
use crate::types::CacheStats;

struct Entry {
    value: String,
    /// Monotonic recency stamp; smallest is least recently used
    recency: u64,
}

struct CacheInner {
    entries: HashMap<String, Entry>,
    counter: u64,
    hits: u64,
    misses: u64,
}

/// Fixed-capacity LRU cache for generated responses
///
/// Entries live until evicted by capacity pressure or cleared explicitly.
/// There is no TTL: prompts are effectively immutable within a process run,
/// so staleness invalidation is out of scope. The whole
/// lookup/promote/insert/evict cycle runs under one mutex, which is enough at
/// the expected contention level.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl ResponseCache {
    /// Create a cache holding at most `max_entries` responses
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                counter: 0,
                hits: 0,
                misses: 0,
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Deterministic cache key for a prompt and its generation parameters
    ///
    /// The canonical form is `prompt|name=value,...` with parameters in
    /// sorted name order, digested with SHA-256. If the canonical parameter
    /// encoding cannot be built, a weaker key of prompt length plus content
    /// digest is used instead; its collision rate is a known limitation
    /// rather than a correctness guarantee.
    pub fn key_for(prompt: &str, params: &GenerationParams) -> String {
        match serde_json::to_string(&params.sorted_pairs()) {
            Ok(encoded) => {
                let mut hasher = Sha256::new();
                hasher.update(prompt.as_bytes());
                hasher.update(b"|");
                hasher.update(encoded.as_bytes());
                hex::encode(hasher.finalize())
            }
            Err(e) => {
                tracing::warn!("Falling back to weak cache key: {}", e);
                let mut hasher = Sha256::new();
                hasher.update(prompt.as_bytes());
                format!("len:{}:{}", prompt.len(), hex::encode(hasher.finalize()))
            }
        }
    }

    /// Look up a key, promoting it to most recently used on a hit
    pub fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.counter += 1;
        let stamp = inner.counter;

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.recency = stamp;
                inner.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert a value, evicting the least recently used entry at capacity
    pub fn insert(&self, key: String, value: String) {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let stamp = inner.counter;

        // Re-inserting an existing key refreshes its position
        if inner.entries.remove(&key).is_none() && inner.entries.len() >= self.max_entries {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.recency)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&lru_key);
            }
        }

        inner.entries.insert(
            key,
            Entry {
                value,
                recency: stamp,
            },
        );
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            max_size: self.max_entries,
            hit_rate: inner.hits as f64 / 1.0f64.max((inner.hits + inner.misses) as f64),
        }
    }

    /// Remove all entries
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        tracing::info!("Response cache cleared");
    }
}
