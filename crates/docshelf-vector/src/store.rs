//! LanceDB-backed [`VectorIndex`].
//!
//! One table at one directory; `create` destructively replaces whatever is
//! persisted there. The in-memory handle is the opened table: `None` until
//! a `create` or `load` succeeds, cleared by `delete`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Table};
use tracing::{info, warn};

use docshelf_core::config::Settings;
use docshelf_core::traits::{Embedder, VectorIndex};
use docshelf_core::types::{DocumentChunk, ScoredMatch};
use docshelf_core::{Error, Result};

use crate::schema::build_arrow_schema;

const EMBED_BATCH: usize = 32;

pub struct LanceVectorIndex {
    dir: PathBuf,
    table_name: String,
    embedder: Box<dyn Embedder>,
    table: Option<Table>,
}

impl LanceVectorIndex {
    pub fn new(dir: PathBuf, table_name: impl Into<String>, embedder: Box<dyn Embedder>) -> Self {
        Self { dir, table_name: table_name.into(), embedder, table: None }
    }

    pub fn from_settings(settings: &Settings, embedder: Box<dyn Embedder>) -> Self {
        Self::new(settings.index_dir(), settings.index.table.clone(), embedder)
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn storage_error(&self, source: impl Into<anyhow::Error>) -> Error {
        Error::Storage { path: self.dir.clone(), source: source.into() }
    }

    fn embed_all(&self, chunks: &[DocumentChunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let dim = self.embedder.dim();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            let embedded = self.embedder.embed_batch(batch).map_err(Error::Indexing)?;
            for v in &embedded {
                if v.len() != dim {
                    return Err(Error::Indexing(anyhow!(
                        "embedder returned a {}-dim vector, expected {dim}",
                        v.len()
                    )));
                }
            }
            pb.inc(batch.len() as u64);
            vectors.extend(embedded);
        }
        pb.finish_and_clear();
        Ok(vectors)
    }

    fn to_record_batch(
        &self,
        chunks: &[DocumentChunk],
        vectors: Vec<Vec<f32>>,
    ) -> anyhow::Result<RecordBatch> {
        let dim = self.embedder.dim() as i32;
        let schema = build_arrow_schema(dim);

        let source_paths: Vec<String> = chunks.iter().map(|c| c.source_path.clone()).collect();
        let pages: Vec<Option<i32>> = chunks.iter().map(|c| c.page.map(|p| p as i32)).collect();
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vector_cells: Vec<Option<Vec<Option<f32>>>> = vectors
            .into_iter()
            .map(|v| Some(v.into_iter().map(Some).collect()))
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(source_paths)),
                Arc::new(Int32Array::from(pages)),
                Arc::new(StringArray::from(contents)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vector_cells.into_iter(), dim)),
            ],
        )?;
        Ok(batch)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn create(&mut self, chunks: &[DocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        info!(chunks = chunks.len(), dir = %self.dir.display(), "creating vector index");

        let vectors = self.embed_all(chunks)?;
        let record_batch = self
            .to_record_batch(chunks, vectors)
            .map_err(Error::Indexing)?;
        let schema = record_batch.schema();

        // Destructive replace of whatever was persisted before.
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| self.storage_error(e))?;
        }

        let conn = connect(self.dir.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(|e| Error::Indexing(e.into()))?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        let table = conn
            .create_table(&self.table_name, reader)
            .execute()
            .await
            .map_err(|e| Error::Indexing(e.into()))?;

        self.table = Some(table);
        info!(chunks = chunks.len(), dir = %self.dir.display(), "vector index created");
        Ok(())
    }

    async fn load(&mut self) -> Result<bool> {
        if !self.dir.exists() {
            warn!(dir = %self.dir.display(), "no vector index at this location");
            return Ok(false);
        }
        let conn = connect(self.dir.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(|e| self.storage_error(e))?;
        let names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| self.storage_error(e))?;
        if !names.contains(&self.table_name) {
            warn!(
                dir = %self.dir.display(),
                table = %self.table_name,
                "storage exists but holds no index table"
            );
            return Ok(false);
        }
        let table = conn
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| self.storage_error(e))?;
        self.table = Some(table);
        info!(dir = %self.dir.display(), "vector index loaded");
        Ok(true)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredMatch>> {
        let table = self.table.as_ref().ok_or(Error::NotReady)?;
        let query_vector = self.embedder.embed_one(text).map_err(Error::Query)?;

        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| Error::Query(e.into()))?
            .limit(k)
            .execute()
            .await
            .map_err(|e| Error::Query(e.into()))?;

        let mut matches = Vec::new();
        while let Some(batch) = TryStreamExt::try_next(&mut stream)
            .await
            .map_err(|e| Error::Query(e.into()))?
        {
            let source_paths = string_column(&batch, "source_path").map_err(Error::Query)?;
            let pages = int32_column(&batch, "page").map_err(Error::Query)?;
            let contents = string_column(&batch, "content").map_err(Error::Query)?;
            let distances = float32_column(&batch, "_distance").map_err(Error::Query)?;

            for i in 0..batch.num_rows() {
                let page = if pages.is_null(i) { None } else { Some(pages.value(i) as u32) };
                matches.push(ScoredMatch {
                    chunk: DocumentChunk {
                        content: contents.value(i).to_string(),
                        source_path: source_paths.value(i).to_string(),
                        page,
                    },
                    distance: distances.value(i),
                });
            }
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn delete(&mut self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| self.storage_error(e))?;
            info!(dir = %self.dir.display(), "vector index removed");
        } else {
            warn!(dir = %self.dir.display(), "no vector index to remove");
        }
        self.table = None;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.table.is_some()
    }

    async fn count(&self) -> Result<usize> {
        let Some(table) = self.table.as_ref() else {
            return Ok(0);
        };
        table
            .count_rows(None)
            .await
            .map_err(|e| Error::Query(e.into()))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column '{name}' missing or not Utf8"))
}

fn int32_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow!("column '{name}' missing or not Int32"))
}

fn float32_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Float32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| anyhow!("column '{name}' missing or not Float32"))
}
