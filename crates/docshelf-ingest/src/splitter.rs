//! Boundary-preferring text splitting.
//!
//! Splits recursively at paragraph, line and word boundaries before falling
//! back to a hard character cut, then merges the resulting pieces into
//! windows of at most `chunk_size` characters with `chunk_overlap`
//! characters carried over between consecutive windows. All sizes are in
//! characters, not bytes.

use tracing::debug;

use docshelf_core::types::{DocumentChunk, RawDocument};
use docshelf_core::{Error, Result};

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// `chunk_overlap < chunk_size` is validated here, once, not per call.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits every document into chunks carrying the parent's metadata.
    /// Order is preserved; empty documents yield no chunks.
    pub fn split_documents(&self, documents: &[RawDocument]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for content in self.split_text(&document.content) {
                chunks.push(DocumentChunk {
                    content,
                    source_path: document.source_path.clone(),
                    page: document.page,
                });
            }
        }
        debug!(documents = documents.len(), chunks = chunks.len(), "split documents");
        chunks
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        self.split_with(trimmed, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some((&separator, finer)) = separators.split_first() else {
            return self.hard_cut(text);
        };
        let parts: Vec<&str> = text.split(separator).filter(|p| !p.is_empty()).collect();
        if parts.len() <= 1 {
            return self.split_with(text, finer);
        }

        // Adjacent small parts merge into windows; an oversized part flushes
        // the window and recurses on finer separators, so windows never span
        // text that was not contiguous at this boundary.
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for part in parts {
            if char_len(part) <= self.chunk_size {
                pending.push(part);
            } else {
                if !pending.is_empty() {
                    chunks.extend(self.merge(&pending, separator));
                    pending.clear();
                }
                chunks.extend(self.split_with(part, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    /// Greedy windowing over pieces that each fit individually. When a
    /// window fills, pieces are dropped from its front until the carried
    /// tail is within `chunk_overlap` characters.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut window_len = 0usize;

        for &piece in pieces {
            let piece_len = char_len(piece);
            if !window.is_empty() && window_len + separator_len + piece_len > self.chunk_size {
                chunks.push(window.join(separator));
                while window_len > self.chunk_overlap
                    || (window_len + separator_len + piece_len > self.chunk_size
                        && window_len > 0)
                {
                    let dropped = char_len(window.remove(0));
                    window_len -= dropped;
                    if window.is_empty() {
                        window_len = 0;
                        break;
                    }
                    window_len -= separator_len;
                }
            }
            window_len += piece_len + if window.is_empty() { 0 } else { separator_len };
            window.push(piece);
        }
        if !window.is_empty() {
            chunks.push(window.join(separator));
        }
        chunks
    }

    fn hard_cut(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
