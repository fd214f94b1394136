//! grounded-rag: Document Q&A with hallucination defense
//!
//! A retrieval-augmented question answering pipeline that fuses semantic and
//! lexical search into one ranked passage set, validates generated answers
//! against their retrieved context, and memoizes generation calls in an LRU
//! cache. Low-confidence answers are replaced with an explicit refusal
//! instead of being served.

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod types;
pub mod validation;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use service::RagService;
pub use types::{
    passage::{Passage, RetrievalResult},
    query::QueryRequest,
    response::{CacheStats, HallucinationCheck, RagAnswer, ValidationInfo},
};
