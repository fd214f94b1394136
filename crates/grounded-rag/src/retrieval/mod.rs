//! Hybrid retrieval: semantic + lexical channels with weighted fusion

pub mod chunker;
pub mod fusion;
pub mod lexical;

pub use chunker::TextChunker;
pub use fusion::{format_retrieved_docs, FusionRetriever};
pub use lexical::Bm25Index;
