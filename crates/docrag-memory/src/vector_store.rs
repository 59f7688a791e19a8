use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde_json::Value;

use crate::types::{ChunkMetadata, ChunkRecord, Document};

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store snapshot {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("chunk {chunk_id}: embedding[{index}] is not a finite number")]
    InvalidEmbedding { chunk_id: String, index: usize },
    #[error("query embedding[{index}] is not a finite number")]
    InvalidQuery { index: usize },
    #[error("chunk {chunk_id}: embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },
    #[error("store lock poisoned: {0}")]
    Lock(String),
}

/// Restricts a similarity query. Every populated field must match.
#[derive(Debug, Clone, Default)]
pub struct VectorStoreFilter {
    pub doc_id: Option<String>,
    pub doc_ids: Option<Vec<String>>,
    /// Matched against the owning document's `source`; orphaned chunks never match.
    pub source: Option<String>,
    /// Exact equality on chunk metadata values.
    pub metadata: Option<ChunkMetadata>,
}

impl VectorStoreFilter {
    #[must_use]
    pub fn by_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_doc_id(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: Some(doc_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(ChunkMetadata::new)
            .insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ChunkRecord,
    pub score: f32,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    /// Insert or replace documents keyed by the hash of `(source, title)`.
    fn upsert_documents(&self, docs: Vec<Document>) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Insert or replace chunks keyed by the hash of `(doc_id, chunkIndex)`, falling back to
    /// the caller's id when `chunkIndex` is absent.
    fn upsert_chunks(
        &self,
        chunks: Vec<ChunkRecord>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Rank stored chunks by cosine similarity, highest first, returning at most `top_k`.
    fn query_by_embedding(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: Option<VectorStoreFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredChunk>, VectorStoreError>>;

    fn get_chunk_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<ChunkRecord>, VectorStoreError>>;

    /// Drop every document and chunk, including persisted state.
    fn reset(&self) -> BoxFuture<'_, Result<(), VectorStoreError>>;
}
