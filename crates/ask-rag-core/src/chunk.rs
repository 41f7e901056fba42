//! Fixed-window text splitter with overlap.
//!
//! Pages are cut into windows of at most `chunk_size` characters. A window
//! prefers to end just after a paragraph break, a newline, or a space found
//! in the second half of the window; when none exists it is hard-split on a
//! character boundary. The next window starts up to `chunk_overlap`
//! characters before the previous one ended (aligned to the first word
//! boundary in that range) so context survives split boundaries.
//!
//! # Example
//!
//! ```rust
//! use ask_rag_core::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(1000, 200);
//! let pieces = splitter.split_text("Hello world.\n\nSecond paragraph.");
//! assert_eq!(pieces.len(), 1);
//! assert_eq!(pieces[0].0, 0);
//! ```

use crate::models::{ChunkMetadata, DocumentChunk, Page};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separators tried, in order, when looking for a soft window end.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits text into overlapping fixed-size windows.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    /// Create a splitter. A zero `chunk_size` is raised to 1 and the overlap
    /// is clamped below the window size so every window makes progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into `(byte_offset, window)` pairs.
    ///
    /// Windows are trimmed of trailing whitespace and never empty. Text that
    /// is empty or all whitespace yields no windows.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        // Byte offset of every char boundary, including the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;

        let mut out = Vec::new();
        let mut start = 0usize;

        loop {
            while start < n && text[bounds[start]..].starts_with(char::is_whitespace) {
                start += 1;
            }
            if start >= n {
                break;
            }

            let hard_end = (start + self.chunk_size).min(n);
            let end = if hard_end == n {
                n
            } else {
                self.soft_end(text, &bounds, start, hard_end)
            };

            let piece = text[bounds[start]..bounds[end]].trim_end();
            if !piece.is_empty() {
                out.push((bounds[start], piece));
            }
            if end == n {
                break;
            }

            start = self.next_start(text, &bounds, start, end);
        }

        out
    }

    /// Split every page and attach source metadata. Chunk indices run
    /// across the whole document, starting at 0.
    pub fn split_pages(&self, source: &str, pages: &[Page]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for (position, text) in self.split_text(&page.text) {
                let chunk_index = chunks.len();
                chunks.push(DocumentChunk {
                    text: text.to_string(),
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        page: page.number,
                        position,
                        chunk_index,
                    },
                });
            }
        }
        chunks
    }

    /// Char index just past the last separator in the second half of the
    /// window, or `hard_end` if there is none.
    fn soft_end(&self, text: &str, bounds: &[usize], start: usize, hard_end: usize) -> usize {
        let lo = start + (hard_end - start) / 2;
        let window = &text[bounds[lo]..bounds[hard_end]];
        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                let byte = bounds[lo] + pos + sep.len();
                if let Ok(idx) = bounds.binary_search(&byte) {
                    if idx > start {
                        return idx;
                    }
                }
            }
        }
        hard_end
    }

    /// Start of the window following one that ended at `end`.
    fn next_start(&self, text: &str, bounds: &[usize], start: usize, end: usize) -> usize {
        let overlap_start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        if overlap_start >= end {
            return end;
        }
        // Begin the overlap on a word boundary when one is available.
        let region = &text[bounds[overlap_start]..bounds[end]];
        match region.find(char::is_whitespace) {
            Some(pos) => bounds
                .binary_search(&(bounds[overlap_start] + pos))
                .unwrap_or(overlap_start),
            None => overlap_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_text_single_window() {
        let splitter = TextSplitter::new(1000, 200);
        let pieces = splitter.split_text("Hello, world!");
        assert_eq!(pieces, vec![(0, "Hello, world!")]);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("  \n\n \t ").is_empty());
    }

    #[test]
    fn test_windows_respect_size() {
        let text = words(500);
        let splitter = TextSplitter::new(100, 20);
        let pieces = splitter.split_text(&text);
        assert!(pieces.len() > 1);
        for (_, piece) in &pieces {
            assert!(piece.chars().count() <= 100, "window too long: {}", piece.len());
        }
    }

    #[test]
    fn test_consecutive_windows_overlap() {
        let text = words(500);
        let splitter = TextSplitter::new(100, 20);
        let pieces = splitter.split_text(&text);
        for pair in pieces.windows(2) {
            let (start_a, a) = pair[0];
            let (start_b, _) = pair[1];
            assert!(start_b > start_a, "windows must make progress");
            assert!(start_b < start_a + a.len(), "windows must overlap");
        }
    }

    #[test]
    fn test_windows_are_verbatim_slices() {
        let text = words(300);
        let splitter = TextSplitter::new(64, 16);
        for (offset, piece) in splitter.split_text(&text) {
            assert_eq!(&text[offset..offset + piece.len()], piece);
        }
    }

    #[test]
    fn test_hard_split_without_separators() {
        let text = "a".repeat(25);
        let splitter = TextSplitter::new(10, 2);
        let pieces = splitter.split_text(&text);
        let lens: Vec<usize> = pieces.iter().map(|(_, p)| p.len()).collect();
        assert_eq!(lens, vec![10, 10, 9]);
        assert_eq!(pieces[1].0, 8);
        assert_eq!(pieces[2].0, 16);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "x".repeat(70), "y".repeat(70));
        let splitter = TextSplitter::new(100, 0);
        let pieces = splitter.split_text(&text);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].1, "x".repeat(70));
        assert_eq!(pieces[1].1, "y".repeat(70));
    }

    #[test]
    fn test_unicode_safety() {
        let text = "héllo 👋 wörld ".repeat(40);
        let splitter = TextSplitter::new(7, 3);
        let pieces = splitter.split_text(&text);
        assert!(!pieces.is_empty());
        for (_, piece) in &pieces {
            assert!(!piece.is_empty());
        }
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let splitter = TextSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap(), 9);
        let text = "b".repeat(40);
        let pieces = splitter.split_text(&text);
        assert!(pieces.len() < 40);
    }

    #[test]
    fn test_split_pages_metadata() {
        let splitter = TextSplitter::new(1000, 200);
        let pages = vec![
            Page {
                number: 0,
                text: "First page text.".to_string(),
            },
            Page {
                number: 1,
                text: "   ".to_string(),
            },
            Page {
                number: 2,
                text: "Third page text.".to_string(),
            },
        ];
        let chunks = splitter.split_pages("report.pdf", &pages);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.page, 0);
        assert_eq!(chunks[0].metadata.chunk_index, 0);
        assert_eq!(chunks[1].metadata.page, 2);
        assert_eq!(chunks[1].metadata.chunk_index, 1);
        assert_eq!(chunks[1].metadata.source, "report.pdf");
        assert_eq!(chunks[1].text, "Third page text.");
    }
}
