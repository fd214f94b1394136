//! Response caching for LLM completions

pub mod cached_llm;
pub mod lru;

pub use cached_llm::CachedLlm;
pub use lru::ResponseCache;
