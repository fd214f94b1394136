//! Provider abstractions for text generation and semantic search
//!
//! Trait-based seams around the two external services the pipeline depends
//! on; concrete adapters talk HTTP, the core only sees the traits.

pub mod llm;
pub mod openai;
pub mod search_service;
pub mod semantic;

pub use llm::{GenerationParams, LlmProvider};
pub use openai::OpenAiLlm;
pub use search_service::RemoteSemanticSearch;
pub use semantic::SemanticSearchProvider;
