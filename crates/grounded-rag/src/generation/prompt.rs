//! Prompt templates for the RAG pipeline

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the answer-generation prompt over retrieved context
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a helpful assistant answering questions about a document.

Given the context information below, answer the query.

If you don't know the answer based ONLY on the context provided, say "I don't have enough information to answer this question."
Keep your answer detailed but concise. Provide specific quotes or page numbers when possible.

Always include a "Sources:" section at the end of your answer that lists the specific sources or chunks used.

Context:
{context}

Query: {question}"#,
            context = context,
            question = question
        )
    }

    /// Build the hallucination-check prompt
    ///
    /// Asks for claim extraction, per-claim verification against the context,
    /// and a banded confidence score, returned as a JSON object.
    pub fn build_hallucination_prompt(context: &str, question: &str, response: &str) -> String {
        format!(
            r#"You are a critical evaluator that checks for hallucinations in AI-generated responses.

Context from knowledge base:
{context}

Question: {question}
Response: {response}

Task 1: Extract key factual claims from the response.

Task 2: For each claim, determine if it is supported by the context.
Create two lists:
1. Verified claims - claims that are directly supported by the context
2. Unverified claims - claims that cannot be verified from the context

Task 3: Evaluate if the response contains any information not supported by the context.
Assign a confidence score on a scale of 0 to 1, where:
- 0.0-0.2: Most of the response is unsupported by the context
- 0.3-0.5: Significant parts are unsupported by the context
- 0.6-0.8: Minor inaccuracies or small unsupported details
- 0.9-1.0: Response is fully supported by the context

Be conservative - only mark as hallucination if it clearly contains facts not in the context.

Reply with a JSON object with fields: is_hallucination (boolean), confidence_score (number), reasoning (string), verified_claims (array of strings), unverified_claims (array of strings)."#,
            context = context,
            question = question,
            response = response
        )
    }

    /// Build the contextual-compression prompt for one retrieved passage
    ///
    /// The model returns only the parts of the passage relevant to the
    /// question, or the literal NO_OUTPUT sentinel when nothing is.
    pub fn build_extract_prompt(question: &str, passage: &str) -> String {
        format!(
            r#"Given the following question and context, extract any part of the context *AS IS* that is relevant to answer the question. If none of the context is relevant return NO_OUTPUT.

Remember, *DO NOT* edit the extracted parts of the context.

> Question: {question}
> Context:
>>>
{passage}
>>>
Extracted relevant parts:"#,
            question = question,
            passage = passage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_prompt_embeds_context_and_question() {
        let prompt = PromptBuilder::build_rag_prompt("what is x?", "[Source 1]\nx is y");
        assert!(prompt.contains("x is y"));
        assert!(prompt.contains("Query: what is x?"));
        assert!(prompt.contains("Sources:"));
    }

    #[test]
    fn test_hallucination_prompt_mentions_bands() {
        let prompt = PromptBuilder::build_hallucination_prompt("ctx", "q", "r");
        assert!(prompt.contains("0.9-1.0"));
        assert!(prompt.contains("unverified_claims"));
    }

    #[test]
    fn test_extract_prompt_has_sentinel() {
        let prompt = PromptBuilder::build_extract_prompt("q", "passage text");
        assert!(prompt.contains("NO_OUTPUT"));
        assert!(prompt.contains("passage text"));
    }
}
