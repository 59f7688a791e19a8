use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::similarity::cosine_similarity;
use crate::types::{ChunkRecord, Document, make_chunk_id, make_doc_id};
use crate::vector_store::{
    BoxFuture, ScoredChunk, VectorStore, VectorStoreError, VectorStoreFilter,
};

pub const STORAGE_FILE_NAME: &str = "vector-store.json";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Snapshot file; its parent directory is created on first write.
    pub path: PathBuf,
    /// Expected embedding dimension. `None` accepts any length.
    pub dimensions: Option<usize>,
}

impl StoreConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimensions: None,
        }
    }

    /// Snapshot at `dir/vector-store.json`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORAGE_FILE_NAME))
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub chunks: usize,
}

#[derive(Default)]
struct StoreState {
    docs: BTreeMap<String, Document>,
    chunks: BTreeMap<String, ChunkRecord>,
}

impl StoreState {
    fn matches(&self, chunk: &ChunkRecord, filter: &VectorStoreFilter) -> bool {
        if filter.doc_id.as_ref().is_some_and(|id| *id != chunk.doc_id) {
            return false;
        }
        if filter
            .doc_ids
            .as_ref()
            .is_some_and(|ids| !ids.contains(&chunk.doc_id))
        {
            return false;
        }
        if let Some(source) = &filter.source {
            let Some(doc) = self.docs.get(&chunk.doc_id) else {
                return false;
            };
            if doc.source != *source {
                return false;
            }
        }
        if let Some(metadata) = &filter.metadata {
            for (key, expected) in metadata {
                if chunk.metadata.get(key) != Some(expected) {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    docs: Vec<&'a Document>,
    chunks: Vec<&'a ChunkRecord>,
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    docs: Vec<Document>,
    #[serde(default)]
    chunks: Vec<ChunkRecord>,
}

/// In-process store persisted as one JSON snapshot, rewritten on every mutation.
///
/// Reads may run concurrently; each mutation holds the write lock until its
/// snapshot is on disk. A failed write rolls the in-memory change back.
pub struct JsonVectorStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for JsonVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonVectorStore")
            .field("path", &self.config.path)
            .field("dimensions", &self.config.dimensions)
            .finish_non_exhaustive()
    }
}

impl JsonVectorStore {
    /// Load the snapshot at `config.path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(config: StoreConfig) -> Result<Self, VectorStoreError> {
        let state = load_snapshot(&config.path)?;
        tracing::debug!(
            path = %config.path.display(),
            docs = state.docs.len(),
            chunks = state.chunks.len(),
            "vector store loaded"
        );
        Ok(Self {
            config,
            state: RwLock::new(state),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn stats(&self) -> Result<StoreStats, VectorStoreError> {
        let state = self.read()?;
        Ok(StoreStats {
            documents: state.docs.len(),
            chunks: state.chunks.len(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get_document(&self, id: &str) -> Result<Option<Document>, VectorStoreError> {
        Ok(self.read()?.docs.get(id).cloned())
    }

    /// Delete a snapshot file without opening it. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and cannot be removed.
    pub fn remove_snapshot(path: &Path) -> Result<(), VectorStoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(VectorStoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, VectorStoreError> {
        self.state
            .read()
            .map_err(|e| VectorStoreError::Lock(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, VectorStoreError> {
        self.state
            .write()
            .map_err(|e| VectorStoreError::Lock(e.to_string()))
    }

    fn apply_documents(&self, docs: Vec<Document>) -> Result<(), VectorStoreError> {
        let mut state = self.write()?;
        let now = now_timestamp();
        let mut previous = Vec::with_capacity(docs.len());

        for doc in docs {
            let id = make_doc_id(&doc.source, &doc.title);
            let created_at = state
                .docs
                .get(&id)
                .map_or_else(|| now.clone(), |existing| existing.created_at.clone());
            let record = Document {
                id: id.clone(),
                created_at,
                updated_at: now.clone(),
                ..doc
            };
            let old = state.docs.insert(id.clone(), record);
            previous.push((id, old));
        }

        if let Err(e) = self.persist(&state) {
            rollback(&mut state.docs, previous);
            return Err(e);
        }
        Ok(())
    }

    fn apply_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), VectorStoreError> {
        for chunk in &chunks {
            self.validate_chunk(chunk)?;
        }

        let mut state = self.write()?;
        let mut previous = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let id = match chunk.chunk_index() {
                Some(index) => make_chunk_id(&chunk.doc_id, index),
                None => chunk.id.clone(),
            };
            let old = state.chunks.insert(id.clone(), ChunkRecord { id: id.clone(), ..chunk });
            previous.push((id, old));
        }

        if let Err(e) = self.persist(&state) {
            rollback(&mut state.chunks, previous);
            return Err(e);
        }
        Ok(())
    }

    fn validate_chunk(&self, chunk: &ChunkRecord) -> Result<(), VectorStoreError> {
        if let Some(index) = chunk.embedding.iter().position(|v| !v.is_finite()) {
            return Err(VectorStoreError::InvalidEmbedding {
                chunk_id: chunk.id.clone(),
                index,
            });
        }
        if let Some(expected) = self.config.dimensions
            && chunk.embedding.len() != expected
        {
            return Err(VectorStoreError::DimensionMismatch {
                chunk_id: chunk.id.clone(),
                expected,
                actual: chunk.embedding.len(),
            });
        }
        Ok(())
    }

    fn rank(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&VectorStoreFilter>,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        if let Some(index) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(VectorStoreError::InvalidQuery { index });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let state = self.read()?;

        // Chunks of another dimension (or none) cannot be compared and are left out.
        let mut scored: Vec<(f32, &ChunkRecord)> = state
            .chunks
            .values()
            .filter(|c| !c.embedding.is_empty() && c.embedding.len() == embedding.len())
            .filter(|c| filter.is_none_or(|f| state.matches(c, f)))
            .map(|c| (cosine_similarity(embedding, &c.embedding), c))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, chunk)| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }

    fn clear(&self) -> Result<(), VectorStoreError> {
        let mut state = self.write()?;
        Self::remove_snapshot(&self.config.path)?;
        state.docs.clear();
        state.chunks.clear();
        tracing::debug!(path = %self.config.path.display(), "vector store reset");
        Ok(())
    }

    fn persist(&self, state: &StoreState) -> Result<(), VectorStoreError> {
        let path = &self.config.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| VectorStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let snapshot = SnapshotRef {
            docs: state.docs.values().collect(),
            chunks: state.chunks.values().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp = tmp_path(path);
        std::fs::write(&tmp, json).map_err(|source| VectorStoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| VectorStoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            docs = state.docs.len(),
            chunks = state.chunks.len(),
            "vector store saved"
        );
        Ok(())
    }
}

impl VectorStore for JsonVectorStore {
    fn upsert_documents(&self, docs: Vec<Document>) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move { self.apply_documents(docs) })
    }

    fn upsert_chunks(
        &self,
        chunks: Vec<ChunkRecord>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move { self.apply_chunks(chunks) })
    }

    fn query_by_embedding(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        filter: Option<VectorStoreFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredChunk>, VectorStoreError>> {
        Box::pin(async move { self.rank(&embedding, top_k, filter.as_ref()) })
    }

    fn get_chunk_by_id(
        &self,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<ChunkRecord>, VectorStoreError>> {
        let id = id.to_owned();
        Box::pin(async move { Ok(self.read()?.chunks.get(&id).cloned()) })
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move { self.clear() })
    }
}

fn load_snapshot(path: &Path) -> Result<StoreState, VectorStoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreState::default()),
        Err(source) => {
            return Err(VectorStoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let snapshot: Snapshot =
        serde_json::from_str(&raw).map_err(|source| VectorStoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let mut state = StoreState::default();
    for doc in snapshot.docs {
        state.docs.insert(doc.id.clone(), doc);
    }
    for chunk in snapshot.chunks {
        state.chunks.insert(chunk.id.clone(), chunk);
    }
    Ok(state)
}

fn rollback<T>(map: &mut BTreeMap<String, T>, previous: Vec<(String, Option<T>)>) {
    for (id, old) in previous.into_iter().rev() {
        match old {
            Some(value) => {
                map.insert(id, value);
            }
            None => {
                map.remove(&id);
            }
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
