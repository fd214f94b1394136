//! Validate generated responses against their retrieved context

use std::sync::Arc;
use std::time::Duration;

use crate::config::ValidationConfig;
use crate::generation::PromptBuilder;
use crate::metrics::MetricsRegistry;
use crate::providers::LlmProvider;
use crate::types::{HallucinationCheck, ValidationInfo};

/// Safe message returned when validation receives an empty answer
const EMPTY_RESPONSE_MESSAGE: &str = "I couldn't generate a valid response. Please try again.";

/// Validate generated responses for hallucinations and citations
///
/// The hallucination check is a best-effort enhancement: timeouts, rate
/// limits, and malformed model output all collapse to "no check available"
/// so answering never blocks on it. Citation validation is pure text
/// inspection and never fails.
pub struct ResponseValidator {
    llm: Arc<dyn LlmProvider>,
    config: ValidationConfig,
    metrics: Arc<MetricsRegistry>,
}

impl ResponseValidator {
    /// Create a new validator
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        config: ValidationConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            llm,
            config,
            metrics,
        }
    }

    /// Confidence threshold below which the orchestrator substitutes a fallback
    pub fn confidence_threshold(&self) -> f32 {
        self.config.confidence_threshold
    }

    /// Time budget for the hallucination check
    ///
    /// Longer content needs proportionally more model time: one extra second
    /// per 1000 characters of context plus answer, capped so a pathological
    /// input cannot stall the query.
    pub fn adaptive_timeout(&self, context: &str, answer: &str) -> Duration {
        let size_factor = (context.len() + answer.len()) as u64 / 1000;
        let secs = (self.config.base_timeout_secs + size_factor).min(self.config.max_timeout_secs);
        Duration::from_secs(secs)
    }

    /// Check the answer for claims unsupported by the context
    ///
    /// Returns `None` when the check is inconclusive for any reason; the
    /// caller proceeds with citation-only validation.
    pub async fn check_hallucination(
        &self,
        answer: &str,
        context: &str,
        question: &str,
    ) -> Option<HallucinationCheck> {
        if answer.is_empty() || context.is_empty() || question.is_empty() {
            tracing::warn!("Missing input for hallucination check");
            return None;
        }

        let timeout = self.adaptive_timeout(context, answer);
        tracing::info!(
            "Running hallucination check with {}s timeout",
            timeout.as_secs()
        );

        let prompt = PromptBuilder::build_hallucination_prompt(context, question, answer);
        let schema = hallucination_schema();

        let outcome = tokio::time::timeout(
            timeout,
            self.llm.complete_structured(&prompt, &schema, timeout),
        )
        .await;

        let value = match outcome {
            Err(_) => {
                tracing::warn!(
                    "Hallucination check timed out after {}s",
                    timeout.as_secs()
                );
                return None;
            }
            Ok(Err(e)) => {
                if e.to_string().to_lowercase().contains("rate limit") {
                    tracing::warn!("Rate limit hit during hallucination check, skipping");
                } else {
                    tracing::error!("Error during hallucination check: {}", e);
                }
                return None;
            }
            Ok(Ok(value)) => value,
        };

        let check: HallucinationCheck = match serde_json::from_value(value) {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!("Invalid hallucination check result: {}", e);
                return None;
            }
        };

        let check = check.sanitize();
        self.metrics
            .record_hallucination_confidence(check.confidence_score);

        tracing::info!(
            "Hallucination check complete. Is hallucination: {}, score: {}, verified: {}, unverified: {}",
            check.is_hallucination,
            check.confidence_score,
            check.verified_claims.len(),
            check.unverified_claims.len()
        );

        Some(check)
    }

    /// Validate the answer's citations and append cautions where needed
    ///
    /// Never fails for a non-empty answer; an empty answer yields a fixed
    /// safe message plus a warning record.
    pub fn validate_response(
        &self,
        answer: &str,
        context: &str,
        question: &str,
        check: Option<&HallucinationCheck>,
    ) -> (String, ValidationInfo) {
        tracing::debug!(
            "Validating response ({} chars) against {} chars of context for: {:.50}",
            answer.len(),
            context.len(),
            question
        );

        if answer.is_empty() {
            tracing::warn!("Empty response provided for validation");
            return (
                EMPTY_RESPONSE_MESSAGE.to_string(),
                ValidationInfo {
                    has_citations: false,
                    warning: Some("Empty response provided".to_string()),
                    ..Default::default()
                },
            );
        }

        let lines: Vec<&str> = answer.split('\n').collect();
        let mut body: Vec<String> = Vec::new();
        let mut citation_block: Vec<String> = Vec::new();
        let mut citations_found = false;

        for (i, line) in lines.iter().enumerate() {
            if is_citation_marker(line) {
                citations_found = true;
                citation_block = lines[i..].iter().map(|l| l.to_string()).collect();
                break;
            }
            body.push(line.to_string());
        }

        let mut info = ValidationInfo {
            has_citations: citations_found,
            ..Default::default()
        };

        if let Some(check) = check {
            info.hallucination_check = Some(check.summary());

            if !check.unverified_claims.is_empty() {
                let mut caution = String::from(
                    "\n\n⚠️ **Caution**: The following claims could not be verified from the source material:\n",
                );
                for claim in &check.unverified_claims {
                    caution.push_str(&format!("- {}\n", claim));
                }
                body.push(caution);
            }
        }

        if citations_found {
            info.citations = Some(citation_block.clone());
            body.extend(citation_block);
        } else {
            info.warning = Some("Response does not cite specific sources".to_string());
            if body.iter().any(|line| line.contains("[Source")) {
                info.has_implicit_citations = true;
                tracing::info!("Response has implicit citations but no formal sources section");
            } else {
                body.push(
                    "\n\n⚠️ Note: This response does not cite specific sources and may be less reliable."
                        .to_string(),
                );
            }
        }

        (body.join("\n"), info)
    }

    /// Templated refusal used when confidence falls below the threshold
    ///
    /// Pure formatting with no side effects.
    pub fn fallback_response(&self, question: &str, confidence_score: f32, reasoning: &str) -> String {
        let confidence_percent = (confidence_score * 100.0) as i32;

        format!(
            r#"I don't have enough reliable information to answer this question confidently.

Your question: "{question}"

Based on the documents I have access to, I cannot provide a satisfactory answer with sufficient confidence (current confidence: {confidence_percent}%).

Reason: {reasoning}

Please try rephrasing your question to focus on topics covered in the documents, or consult additional sources for this information.
"#,
            question = question,
            confidence_percent = confidence_percent,
            reasoning = reasoning
        )
    }
}

/// JSON schema for the structured hallucination check
fn hallucination_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "is_hallucination": { "type": "boolean" },
            "confidence_score": { "type": "number" },
            "reasoning": { "type": "string" },
            "verified_claims": { "type": "array", "items": { "type": "string" } },
            "unverified_claims": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["is_hallucination", "confidence_score", "reasoning"]
    })
}

/// Match a sources/references header line, case-insensitive
fn is_citation_marker(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower.starts_with("sources:")
        || lower.starts_with("source:")
        || lower == "sources"
        || lower == "references:"
        || lower == "references"
}
