//! In-memory BM25 index over corpus passages

use std::collections::HashMap;

use crate::types::Passage;

/// BM25 term-saturation parameter
const K1: f32 = 1.2;
/// BM25 length-normalization parameter
const B: f32 = 0.75;

/// Ranked keyword index for the lexical retrieval channel
///
/// Built once from a chunked corpus and swapped in by reference; it is never
/// mutated after construction, so concurrent readers need no locking.
pub struct Bm25Index {
    passages: Vec<Passage>,
    /// Term frequency per document
    term_freqs: Vec<HashMap<String, u32>>,
    /// Document length in tokens
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    /// Number of documents containing each term
    doc_freqs: HashMap<String, u32>,
}

impl Bm25Index {
    /// Build an index over the given passages
    pub fn build(passages: Vec<Passage>) -> Self {
        let mut term_freqs = Vec::with_capacity(passages.len());
        let mut doc_lens = Vec::with_capacity(passages.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for passage in &passages {
            let tokens = tokenize(&passage.content);
            doc_lens.push(tokens.len() as f32);

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / doc_lens.len() as f32
        };

        Self {
            passages,
            term_freqs,
            doc_lens,
            avg_doc_len,
            doc_freqs,
        }
    }

    /// Number of indexed passages
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if the index holds no passages
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Top-k passages by BM25 score, best-first, scores attached
    pub fn search(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let total_docs = self.passages.len() as f32;
        let mut scored: Vec<(usize, f32)> = Vec::new();

        for (doc_idx, freqs) in self.term_freqs.iter().enumerate() {
            let mut score = 0.0f32;

            for term in &query_terms {
                let tf = match freqs.get(term) {
                    Some(&tf) => tf as f32,
                    None => continue,
                };
                let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
                let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();

                let len_norm = 1.0 - B + B * self.doc_lens[doc_idx] / self.avg_doc_len;
                score += idf * tf * (K1 + 1.0) / (tf + K1 * len_norm);
            }

            if score > 0.0 {
                scored.push((doc_idx, score));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(idx, score)| self.passages[idx].clone().with_score(score))
            .collect()
    }
}

/// Lowercase alphanumeric tokenization
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Passage> {
        vec![
            Passage::new("the solar panel converts sunlight into electricity", "energy.txt"),
            Passage::new("wind turbines generate electricity from moving air", "energy.txt"),
            Passage::new("the recipe calls for flour sugar and butter", "baking.txt"),
            Passage::new("solar energy storage uses large battery banks", "energy.txt"),
        ]
    }

    #[test]
    fn test_empty_index() {
        let index = Bm25Index::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.search("anything", 5).is_empty());
    }

    #[test]
    fn test_relevant_passage_ranks_first() {
        let index = Bm25Index::build(corpus());
        let results = index.search("solar panel sunlight", 4);
        assert!(!results.is_empty());
        assert!(results[0].content.contains("solar panel"));
    }

    #[test]
    fn test_unrelated_query_matches_nothing() {
        let index = Bm25Index::build(corpus());
        let results = index.search("quantum chromodynamics", 4);
        assert!(results.is_empty());
    }

    #[test]
    fn test_scores_attached_and_descending() {
        let index = Bm25Index::build(corpus());
        let results = index.search("electricity", 4);
        assert!(results.len() >= 2);
        let scores: Vec<f32> = results.iter().map(|p| p.score.unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_k_limits_results() {
        let index = Bm25Index::build(corpus());
        let results = index.search("the", 1);
        assert!(results.len() <= 1);
    }

    #[test]
    fn test_rare_term_outweighs_common() {
        let index = Bm25Index::build(corpus());
        // "butter" appears in one passage, "the" in several
        let results = index.search("butter", 4);
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("butter"));
    }
}
