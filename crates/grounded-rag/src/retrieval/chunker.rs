//! Fixed-size text chunking with overlap

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// The overlap is clamped below the chunk size so the window always
    /// advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Split text into overlapping fixed-size chunks
    ///
    /// Boundaries are snapped to valid char boundaries; whitespace-only
    /// chunks are dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        if text.trim().is_empty() {
            return chunks;
        }

        let step = self.chunk_size - self.overlap;
        let mut start = 0usize;

        while start < text.len() {
            let mut end = (start + self.chunk_size).min(text.len());
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }

            let piece = text[start..end].trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            if end >= text.len() {
                break;
            }

            start += step;
            while start < text.len() && !text.is_char_boundary(start) {
                start += 1;
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(100, 20);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n  ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(100, 20);
        let chunks = chunker.chunk("short text");
        assert_eq!(chunks, vec!["short text"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(50, 10);
        let text = "a".repeat(200);
        let chunks = chunker.chunk(&text);
        assert!(chunks.iter().all(|c| c.len() <= 50));
        assert!(chunks.len() > 1);
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let chunker = TextChunker::new(10, 4);
        let text = "0123456789abcdefghij";
        let chunks = chunker.chunk(&text);
        // Second chunk starts 6 characters in, repeating the previous tail
        assert_eq!(chunks[0], "0123456789");
        assert!(chunks[1].starts_with("6789"));
    }

    #[test]
    fn test_multibyte_boundaries() {
        let chunker = TextChunker::new(5, 2);
        let text = "héllo wörld çà et là";
        // Must not panic on non-ASCII boundaries
        let chunks = chunker.chunk(text);
        assert!(!chunks.is_empty());
    }
}
