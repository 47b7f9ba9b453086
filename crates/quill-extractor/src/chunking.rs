//! Text chunking strategies for large documents
//!
//! Sizes are counted in characters, never bytes, so a cut never lands inside
//! a multi-byte code point.

use crate::config::ChunkStrategy;
use quill_domain::traits::Chunker;

/// Chunks text according to the specified strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    strategy: ChunkStrategy,
    max_chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(strategy: ChunkStrategy, max_chunk_size: usize) -> Self {
        Self {
            strategy,
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Chunk by paragraphs (double newlines)
    fn chunk_by_paragraph(&self, text: &str) -> Vec<String> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        self.combine_until_limit(paragraphs)
    }

    /// Chunk by sections (markdown headers or numbered sections)
    fn chunk_by_section(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current_section = String::new();

        for line in text.lines() {
            if is_section_header(line) && !current_section.trim().is_empty() {
                sections.push(current_section.trim().to_string());
                current_section.clear();
            }
            current_section.push_str(line);
            current_section.push('\n');
        }

        if !current_section.trim().is_empty() {
            sections.push(current_section.trim().to_string());
        }

        if sections.len() <= 1 {
            return self.chunk_by_paragraph(text);
        }
        self.combine_until_limit(sections)
    }

    /// Chunk at sentence boundaries by size only
    fn chunk_by_token_count(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return vec![text.trim().to_string()];
        }

        let mut chunks = Vec::new();
        let mut current_chunk = String::new();
        let mut current_len = 0;

        for sentence in sentences {
            let len = sentence.chars().count() + 1;
            if current_len + len > self.max_chunk_size && !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk.clear();
                current_len = 0;
            }
            if len > self.max_chunk_size {
                chunks.extend(split_at_char_limit(sentence, self.max_chunk_size));
                continue;
            }
            current_chunk.push_str(sentence);
            current_chunk.push(' ');
            current_len += len;
        }

        if !current_chunk.trim().is_empty() {
            chunks.push(current_chunk.trim().to_string());
        }

        chunks
    }

    /// Combine elements until they reach the size limit
    fn combine_until_limit<S: AsRef<str>>(&self, elements: Vec<S>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current_chunk = String::new();
        let mut current_len = 0;

        for element in elements {
            let element_str = element.as_ref();
            let len = element_str.chars().count();

            if current_len + len + 2 > self.max_chunk_size && !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk.clear();
                current_len = 0;
            }

            // A single oversized element is cut on its own
            if len > self.max_chunk_size {
                chunks.extend(split_at_char_limit(element_str, self.max_chunk_size));
                continue;
            }

            current_chunk.push_str(element_str);
            current_chunk.push_str("\n\n");
            current_len += len + 2;
        }

        if !current_chunk.trim().is_empty() {
            chunks.push(current_chunk.trim().to_string());
        }

        chunks
    }
}

impl Chunker for TextChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.max_chunk_size {
            return vec![text.to_string()];
        }

        let chunks = match self.strategy {
            ChunkStrategy::ByParagraph => self.chunk_by_paragraph(text),
            ChunkStrategy::BySection => self.chunk_by_section(text),
            ChunkStrategy::ByTokenCount => self.chunk_by_token_count(text),
        };

        if chunks.is_empty() {
            return vec![text.to_string()];
        }
        chunks
    }
}

fn is_section_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return true;
    }
    // "1. Title", "12. Title"
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && trimmed[digits..].starts_with(". ")
}

/// Split after `.`, `!` or `?`, keeping the punctuation.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Split text into pieces of at most `limit` characters
fn split_at_char_limit(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 100);
        let text = "Short text here.";
        assert_eq!(chunker.chunk(text), vec![text.to_string()]);
    }

    #[test]
    fn test_chunk_by_paragraph() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 50);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunker.chunk(text);

        assert_eq!(
            chunks,
            vec![
                "First paragraph here.\n\nSecond paragraph here.".to_string(),
                "Third paragraph here.".to_string(),
            ]
        );
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_chunk_by_section_with_markdown() {
        let chunker = TextChunker::new(ChunkStrategy::BySection, 25);
        let text = "# Section 1\nContent 1\n# Section 2\nContent 2";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("Section 1"));
        assert!(chunks[1].contains("Section 2"));
    }

    #[test]
    fn test_chunk_by_section_with_numbered() {
        let chunker = TextChunker::new(ChunkStrategy::BySection, 30);
        let text = "1. First section\nContent\n2. Second section\nMore content";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("2. Second"));
    }

    #[test]
    fn test_section_header_detection() {
        assert!(is_section_header("## Title"));
        assert!(is_section_header("12. Twelve"));
        assert!(!is_section_header("3.5 million"));
        assert!(!is_section_header("plain line"));
    }

    #[test]
    fn test_chunk_by_token_count() {
        let chunker = TextChunker::new(ChunkStrategy::ByTokenCount, 25);
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "First sentence here.");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 25);
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 100);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\n ").is_empty());
    }

    #[test]
    fn test_very_long_single_paragraph() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 20);
        let text = "a".repeat(100);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() == 20));
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundaries() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 7);
        let text = "áéíóúñ".repeat(5);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
    }

    #[test]
    fn test_section_fallback_to_paragraph() {
        let chunker = TextChunker::new(ChunkStrategy::BySection, 20);
        let text = "Just text\n\nWith paragraphs\n\nBut no sections";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks, vec!["Just text", "With paragraphs", "But no sections"]);
    }

    #[test]
    fn test_chunks_preserve_order() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 12);
        let text = "one\n\ntwo\n\nthree\n\nfour";
        let joined = chunker.chunk(text).join(" ");
        let words: Vec<_> = joined.split_whitespace().collect();
        assert_eq!(words, vec!["one", "two", "three", "four"]);
    }
}
