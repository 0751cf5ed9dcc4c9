use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentChunk, RawDocument, ScoredMatch};

/// Resolves a file-or-directory path into loaded text units.
pub trait Loader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<RawDocument>>;
}

/// Maps text to fixed-length vectors. The dimension must stay constant for
/// the lifetime of any one index; mixing embedders across `create` calls on
/// the same storage location is undefined behavior.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Lifecycle of one persisted vector index with a single in-memory handle.
///
/// Callers must serialize `create`/`load`/`delete` against concurrent
/// `query` calls; `create` destructively replaces the storage location.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds and indexes `chunks`, replacing any prior persisted content.
    /// Fails with [`crate::Error::EmptyInput`] when `chunks` is empty.
    async fn create(&mut self, chunks: &[DocumentChunk]) -> Result<()>;

    /// Binds the handle to previously persisted storage. `Ok(false)` when
    /// the location does not exist (the expected "no index yet" case);
    /// [`crate::Error::Storage`] when it exists but cannot be opened.
    async fn load(&mut self) -> Result<bool>;

    /// Top-`k` matches for `text`, ascending by distance. Fails with
    /// [`crate::Error::NotReady`] when no handle is bound.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredMatch>>;

    /// Removes the persisted storage when present (logged no-op otherwise)
    /// and clears the in-memory handle regardless.
    async fn delete(&mut self) -> Result<()>;

    fn is_ready(&self) -> bool;

    /// Number of indexed chunks.
    async fn count(&self) -> Result<usize>;
}

/// Maps a fully assembled prompt to generated text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
