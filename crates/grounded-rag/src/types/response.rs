//! Answer, validation, and cache statistics types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Passage;

/// Result of the LLM hallucination check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationCheck {
    /// Whether the response contains claims unsupported by the context
    pub is_hallucination: bool,
    /// Confidence that the response is supported, in [0, 1]
    pub confidence_score: f32,
    /// Model justification for the verdict
    #[serde(default)]
    pub reasoning: String,
    /// Claims directly supported by the context
    #[serde(default)]
    pub verified_claims: Vec<String>,
    /// Claims that could not be verified from the context
    #[serde(default)]
    pub unverified_claims: Vec<String>,
}

impl HallucinationCheck {
    /// Clamp the confidence score into [0, 1]
    ///
    /// Models occasionally return out-of-range scores; the stored value is
    /// always clamped.
    pub fn sanitize(mut self) -> Self {
        self.confidence_score = self.confidence_score.clamp(0.0, 1.0);
        self
    }

    /// Compact summary for embedding in validation info
    pub fn summary(&self) -> HallucinationSummary {
        HallucinationSummary {
            is_hallucination: self.is_hallucination,
            confidence_score: self.confidence_score,
            reasoning: self.reasoning.clone(),
        }
    }
}

/// Compact hallucination verdict embedded in [`ValidationInfo`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationSummary {
    pub is_hallucination: bool,
    pub confidence_score: f32,
    pub reasoning: String,
}

/// Outcome of citation validation over a generated answer
///
/// Derived purely from text inspection of the answer plus the optional
/// hallucination check; has no identity of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationInfo {
    /// The answer carries a formal sources/references section
    pub has_citations: bool,
    /// No formal section, but the body contains bracketed source tags
    #[serde(default)]
    pub has_implicit_citations: bool,
    /// Validation warning, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Lines of the citation block, when a formal section was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
    /// Embedded hallucination verdict, when a check completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_check: Option<HallucinationSummary>,
}

/// Final answer aggregate returned to the caller
///
/// Created once per query; the pipeline retains nothing after returning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Correlation id for this query
    pub query_id: Uuid,
    /// The original question
    pub question: String,
    /// Final response text (validated, possibly fallback-substituted)
    pub response: String,
    /// Passages the answer was grounded on
    pub passages: Vec<Passage>,
    /// Citation validation outcome (absent on error answers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationInfo>,
    /// Full hallucination check, when one completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_check: Option<HallucinationCheck>,
    /// When the answer was produced
    pub created_at: DateTime<Utc>,
    /// Total processing time in milliseconds
    pub processing_time_ms: u64,
    /// Internal error description, on error answers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagAnswer {
    /// Build the error-shaped answer returned when a query cannot complete
    ///
    /// User-visible text is a plain explanation plus the correlation id;
    /// internal errors are never surfaced raw in the response field.
    pub fn from_error(
        query_id: Uuid,
        question: impl Into<String>,
        error: impl std::fmt::Display,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            query_id,
            question: question.into(),
            response: format!(
                "I encountered an error while processing your question. \
                 Please try again. (reference: {})",
                query_id
            ),
            passages: Vec::new(),
            validation: None,
            hallucination_check: None,
            created_at: Utc::now(),
            processing_time_ms,
            error: Some(error.to_string()),
        }
    }
}

/// Response cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_size: usize,
    /// hits / max(1, hits + misses)
    pub hit_rate: f64,
}
