//! Domain types shared by the ingestion, index and retrieval engines.

use std::path::Path;

use serde::{Deserialize, Serialize};

const PREVIEW_CHARS: usize = 150;

/// One loaded unit of source text, before chunking.
///
/// - `content`: the extracted text
/// - `source_path`: path of the file it came from
/// - `page`: 1-based page number for paginated formats, `None` otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub content: String,
    pub source_path: String,
    pub page: Option<u32>,
}

/// A bounded-length fragment of a [`RawDocument`] that is independently
/// embedded and indexed. Carries its parent's source metadata unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub source_path: String,
    pub page: Option<u32>,
}

/// A retrieval result: a chunk plus its distance to the query vector.
/// Lower distance = more similar; `>= 0`, unbounded above.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub chunk: DocumentChunk,
    pub distance: f32,
}

/// Human-facing view of a retrieved source, deduplicated per
/// `(file_name, page)`.
///
/// `similarity` is `clamp(1 - distance, 0, 1)`: a display heuristic, not a
/// probability. L2 distances above 1 all floor at 0.0; the underlying ranked
/// order is unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    pub file_name: String,
    pub page: Option<u32>,
    pub preview: String,
    pub similarity: f32,
}

impl SourceCitation {
    pub fn from_match(m: &ScoredMatch) -> Self {
        let file_name = file_name_of(&m.chunk.source_path);
        let preview = preview_of(&m.chunk.content);
        Self {
            file_name,
            page: m.chunk.page,
            preview,
            similarity: (1.0 - m.distance).clamp(0.0, 1.0),
        }
    }

    /// Identity under which citations are deduplicated.
    pub fn identity(&self) -> (String, Option<u32>) {
        (self.file_name.clone(), self.page)
    }
}

/// Outcome of one RAG query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub question: String,
}

impl QueryResult {
    /// Renders the citation list for terminal display. Empty string when
    /// there are no sources.
    pub fn format_sources(&self) -> String {
        if self.sources.is_empty() {
            return String::new();
        }
        let mut lines = vec![
            String::new(),
            "=".repeat(60),
            "SOURCES".to_string(),
            "=".repeat(60),
        ];
        for (i, source) in self.sources.iter().enumerate() {
            lines.push(format!("\n[{}] File: {}", i + 1, source.file_name));
            lines.push(format!("    Page: {}", page_label(source.page)));
            lines.push(format!("    Similarity: {:.0}%", source.similarity * 100.0));
            lines.push(format!("    Preview: {}", source.preview));
        }
        lines.push(format!("\n{}", "=".repeat(60)));
        lines.join("\n")
    }
}

/// Snapshot of the index state, shown by the shell's stats view.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub index_dir: String,
    pub is_ready: bool,
}

impl IndexStats {
    pub fn format_stats(&self) -> String {
        let status = if self.is_ready { "ready" } else { "not loaded" };
        format!(
            "Chunks: {}\nLocation: {}\nStatus: {}",
            self.total_chunks, self.index_dir, status
        )
    }
}

pub fn file_name_of(source_path: &str) -> String {
    Path::new(source_path)
        .file_name()
        .map_or_else(|| source_path.to_string(), |n| n.to_string_lossy().to_string())
}

pub fn page_label(page: Option<u32>) -> String {
    page.map_or_else(|| "N/A".to_string(), |p| p.to_string())
}

fn preview_of(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}
