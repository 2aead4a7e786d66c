//! Splits parsed pages into overlapping chunks sized for embedding.

use serde::{Deserialize, Serialize};

use crate::core::config::IngestConfig;
use super::parser::ParsedPage;

/// A text chunk with source information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// The text content
    pub text: String,
    /// Source identifier (file name)
    pub source: String,
    /// 1-based page the chunk was cut from
    pub page: u32,
    /// Chunk index within the page
    pub chunk_index: usize,
    /// Character offset within the page text
    pub start_offset: usize,
}

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
        }
    }

    pub fn split_pages(&self, pages: &[ParsedPage], source: &str) -> Vec<TextChunk> {
        pages
            .iter()
            .flat_map(|page| self.split_page(page, source))
            .collect()
    }

    /// Split one page into overlapping chunks.
    pub fn split_page(&self, page: &ParsedPage, source: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = page.text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window = &chars[start..end];

            // Try to break at sentence boundary
            let cut = if end < total_chars {
                sentence_boundary(window)
            } else {
                window.len()
            };

            let text: String = window[..cut].iter().collect::<String>().trim().to_string();
            if !text.is_empty() {
                chunks.push(TextChunk {
                    text,
                    source: source.to_string(),
                    page: page.page,
                    chunk_index: chunks.len(),
                    start_offset: start,
                });
            }

            if end == total_chars {
                break;
            }
            // The next window overlaps the text actually taken, not the full window.
            start = (start + cut).saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}

/// Length of `window` up to the last sentence ending in its final fifth,
/// or the whole window when there is none.
fn sentence_boundary(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;

    for pos in (search_start..window.len()).rev() {
        let is_end = matches!(window[pos], '.' | '!' | '?');
        let followed_by_space = window
            .get(pos + 1)
            .map(|c| *c == ' ' || *c == '\n')
            .unwrap_or(false);
        if is_end && followed_by_space {
            return pos + 2;
        }
    }

    window.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(&IngestConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    fn page(n: u32, text: &str) -> ParsedPage {
        ParsedPage {
            page: n,
            text: text.to_string(),
        }
    }

    #[test]
    fn short_page_is_one_chunk() {
        let chunks = chunker(500, 20).split_page(&page(3, "Anemia is a condition."), "gale.pdf");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 3);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Anemia is a condition.");
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let text = "x".repeat(250);
        let chunks = chunker(100, 20).split_page(&page(1, &text), "gale.pdf");

        let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(offsets, vec![0, 80, 160]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
    }

    #[test]
    fn prefers_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(88), "b".repeat(60));
        let chunks = chunker(100, 10).split_page(&page(1, &text), "gale.pdf");

        assert!(chunks[0].text.ends_with('.'));
        assert_eq!(chunks[0].text.chars().count(), 89);
    }

    #[test]
    fn sentence_cut_leaves_no_gap_before_next_window() {
        let text = format!("{}. MARKER{}", "a".repeat(420), "b".repeat(600));
        let chunks = chunker(500, 20).split_page(&page(1, &text), "gale.pdf");

        let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(offsets, vec![0, 402, 882]);
        assert!(chunks.iter().any(|c| c.text.contains("MARKER")));

        let chars: Vec<char> = text.chars().collect();
        let mut covered = vec![false; chars.len()];
        for chunk in &chunks {
            let len = chunk.text.chars().count();
            for slot in &mut covered[chunk.start_offset..chunk.start_offset + len] {
                *slot = true;
            }
        }
        for (i, ch) in chars.iter().enumerate() {
            assert!(covered[i] || ch.is_whitespace(), "char {} not in any chunk", i);
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "é".repeat(130);
        let chunks = chunker(50, 5).split_page(&page(1, &text), "gale.pdf");

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.text.chars().all(|ch| ch == 'é')));
    }

    #[test]
    fn blank_pages_produce_nothing() {
        let pages = vec![page(1, ""), page(2, "   \n "), page(3, "Text.")];
        let chunks = chunker(100, 10).split_pages(&pages, "gale.pdf");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 3);
    }
}
