//! Retrieval orchestrator.
//!
//! Build time: load → split → index. Query time: retrieve → assemble
//! context → generate, with source extraction running over the same ranked
//! matches. Collaborators arrive as trait objects so test doubles drop in
//! without touching the flow.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use docshelf_core::config::Settings;
use docshelf_core::traits::{Generator, Loader, VectorIndex};
use docshelf_core::types::{IndexStats, QueryResult, ScoredMatch, SourceCitation};
use docshelf_core::{Error, Result};
use docshelf_ingest::TextSplitter;

use crate::prompt::{assemble_context, render, DEFAULT_PROMPT_TEMPLATE};

pub struct RagEngine {
    retrieval_k: usize,
    index_dir: String,
    loader: Box<dyn Loader>,
    splitter: TextSplitter,
    index: Box<dyn VectorIndex>,
    generator: Box<dyn Generator>,
    prompt_template: String,
}

impl RagEngine {
    pub fn new(
        settings: &Settings,
        loader: Box<dyn Loader>,
        index: Box<dyn VectorIndex>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        let splitter =
            TextSplitter::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
        Ok(Self {
            retrieval_k: settings.retrieval.k,
            index_dir: settings.index_dir().display().to_string(),
            loader,
            splitter,
            index,
            generator,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        })
    }

    /// Swaps the instruction template; `{context}` and `{question}` are the
    /// binding points.
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    /// Loads, splits and indexes everything under `path`. `Ok(false)` when
    /// the corpus produced no chunks; an empty corpus is a normal outcome,
    /// not an error. Ingestion errors (NotFound, UnsupportedFormat)
    /// propagate unwrapped; index-side failures surface as
    /// [`Error::Indexing`].
    pub async fn index_documents(&mut self, path: &Path) -> Result<bool> {
        info!(path = %path.display(), "indexing documents");
        let documents = self.loader.load(path)?;
        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            warn!(path = %path.display(), "no content to index");
            return Ok(false);
        }
        info!(documents = documents.len(), chunks = chunks.len(), "corpus prepared");

        self.index.create(&chunks).await.map_err(|e| match e {
            already @ Error::Indexing(_) => already,
            other => Error::Indexing(anyhow::Error::new(other)),
        })?;
        info!("indexing complete");
        Ok(true)
    }

    /// Binds to a previously persisted index; `Ok(false)` when none exists.
    pub async fn load_existing_index(&mut self) -> Result<bool> {
        self.index.load().await
    }

    /// Answers `question` from the indexed corpus. `k` defaults to the
    /// configured retrieval depth. Fails fast with [`Error::NotReady`] when
    /// no index is bound; that precondition is never wrapped, so callers
    /// can tell "index first" apart from a broken pipeline.
    pub async fn query(&self, question: &str, k: Option<usize>) -> Result<QueryResult> {
        if !self.index.is_ready() {
            return Err(Error::NotReady);
        }
        let k = k.unwrap_or(self.retrieval_k);

        info!(k, "retrieving relevant chunks");
        let matches = self.index.query(question, k).await?;

        let context = assemble_context(&matches);
        let prompt = render(&self.prompt_template, &context, question);

        info!(matches = matches.len(), "generating answer");
        let answer = self.generator.generate(&prompt).await.map_err(Error::Query)?;

        let sources = extract_sources(&matches);
        Ok(QueryResult {
            answer,
            sources,
            question: question.to_string(),
        })
    }

    /// Removes the persisted index; storage absence is not an error.
    pub async fn delete_index(&mut self) -> Result<()> {
        self.index.delete().await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_chunks: self.index.count().await?,
            index_dir: self.index_dir.clone(),
            is_ready: self.index.is_ready(),
        })
    }
}

/// Ranked matches → deduplicated citations. Identity is `(file_name, page)`;
/// the first (highest-ranked) occurrence wins so a page split into several
/// overlapping chunks is never cited twice.
pub fn extract_sources(matches: &[ScoredMatch]) -> Vec<SourceCitation> {
    let mut seen: HashSet<(String, Option<u32>)> = HashSet::new();
    let mut sources = Vec::new();
    for m in matches {
        let citation = SourceCitation::from_match(m);
        if seen.insert(citation.identity()) {
            sources.push(citation);
        }
    }
    sources
}
