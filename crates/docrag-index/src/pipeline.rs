//! Ingestion orchestrator: walk → chunk → embed → store.

use std::path::PathBuf;
use std::sync::Arc;

use docrag_llm::EmbeddingProvider;
use docrag_memory::{ChunkMetadata, ChunkRecord, Document, VectorStore, make_chunk_id, make_doc_id};
use futures::StreamExt;
use serde_json::Value;

use crate::chunker::{ChunkOptions, TextChunk, TextChunker};
use crate::error::{IndexError, Result};
use crate::loader::{
    DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, DirectorySource, DocumentSource, SourceFile,
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunking: ChunkOptions,
    /// Embedding requests in flight at once. `1` embeds strictly one chunk at a time.
    pub embed_concurrency: usize,
    pub extensions: Vec<String>,
    pub max_file_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            embed_concurrency: 1,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub dir: PathBuf,
    /// Clear the store before ingesting.
    pub reset: bool,
    /// Ingest at most this many files, after sorting.
    pub limit: Option<usize>,
}

impl IngestOptions {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reset: false,
            limit: None,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_scanned: usize,
    pub docs_ingested: usize,
    pub chunks_ingested: usize,
    pub chunks_skipped: usize,
    pub docs_skipped: usize,
    pub errors: Vec<String>,
    pub storage_path: Option<PathBuf>,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct FileOutcome {
    chunks_ingested: usize,
    chunks_skipped: usize,
    errors: Vec<String>,
}

pub struct IngestionPipeline<P: EmbeddingProvider> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    chunker: TextChunker,
    config: PipelineConfig,
    storage_path: Option<PathBuf>,
}

impl<P: EmbeddingProvider> IngestionPipeline<P> {
    /// # Errors
    ///
    /// Returns an error if the chunking options or the concurrency are invalid.
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<P>,
        config: PipelineConfig,
    ) -> Result<Self> {
        if config.embed_concurrency == 0 {
            return Err(IndexError::InvalidOptions {
                field: "embed_concurrency",
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            store,
            provider,
            chunker: TextChunker::new(config.chunking)?,
            config,
            storage_path: None,
        })
    }

    /// Path reported back in [`IngestReport::storage_path`].
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Ingest every recognized file under `options.dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be walked or the store fails.
    /// Per-file read failures and per-chunk embedding failures are reported, not raised.
    pub async fn ingest(&self, options: &IngestOptions) -> Result<IngestReport> {
        let source = DirectorySource::new(&options.dir)
            .with_extensions(&self.config.extensions)
            .with_max_file_size(self.config.max_file_size);
        self.ingest_source(&source, options.reset, options.limit)
            .await
    }

    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest`].
    pub async fn ingest_source(
        &self,
        source: &dyn DocumentSource,
        reset: bool,
        limit: Option<usize>,
    ) -> Result<IngestReport> {
        let start = std::time::Instant::now();
        let mut report = IngestReport {
            storage_path: self.storage_path.clone(),
            ..IngestReport::default()
        };

        if reset {
            self.store.reset().await?;
            tracing::info!("storage reset");
        }

        let mut files = source.files()?;
        if let Some(limit) = limit {
            files.truncate(limit);
        }
        let total = files.len();
        tracing::info!(total, "ingestion started");

        for (i, file) in files.iter().enumerate() {
            report.files_scanned += 1;
            let text = match source.read(file).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %file.relative_path, "skipping unreadable file: {e}");
                    report.docs_skipped += 1;
                    report.errors.push(format!("{}: {e}", file.relative_path));
                    continue;
                }
            };

            let outcome = self.ingest_file(file, &text).await?;
            report.chunks_skipped += outcome.chunks_skipped;
            report.errors.extend(outcome.errors);
            if outcome.chunks_ingested == 0 {
                report.docs_skipped += 1;
            } else {
                report.docs_ingested += 1;
                report.chunks_ingested += outcome.chunks_ingested;
            }

            tracing::info!(
                file = %file.relative_path,
                progress = format_args!("{}/{total}", i + 1),
                chunks = outcome.chunks_ingested,
                skipped = outcome.chunks_skipped,
            );
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            docs = report.docs_ingested,
            chunks = report.chunks_ingested,
            duration_ms = report.duration_ms,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_file(&self, file: &SourceFile, text: &str) -> Result<FileOutcome> {
        let mut outcome = FileOutcome::default();
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::debug!(file = %file.relative_path, "no content, skipped");
            return Ok(outcome);
        }

        let title = file.title();
        let doc_id = make_doc_id(&file.relative_path, title);

        // `buffered` yields results in input order whatever the completion order.
        let provider = &self.provider;
        let embeddings: Vec<_> = futures::stream::iter(chunks.iter().map(|chunk| async move {
            provider
                .embed(&chunk.text)
                .await
                .map(|vectors| vectors.into_iter().next())
        }))
        .buffered(self.config.embed_concurrency)
        .collect()
        .await;

        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match embedding {
                Ok(Some(embedding)) if !embedding.is_empty() => {
                    records.push(chunk_record(&doc_id, file, title, chunk, embedding));
                }
                Ok(_) => {
                    tracing::warn!(
                        file = %file.relative_path,
                        chunk = chunk.chunk_index,
                        "no embedding returned, chunk skipped"
                    );
                    outcome.chunks_skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        file = %file.relative_path,
                        chunk = chunk.chunk_index,
                        "embedding failed, chunk skipped: {e}"
                    );
                    outcome.chunks_skipped += 1;
                    outcome
                        .errors
                        .push(format!("{}#{}: {e}", file.relative_path, chunk.chunk_index));
                }
            }
        }

        if records.is_empty() {
            tracing::warn!(file = %file.relative_path, "no chunk embedded, document skipped");
            return Ok(outcome);
        }

        outcome.chunks_ingested = records.len();
        // No document record without its chunks.
        self.store.upsert_chunks(records).await?;
        self.store
            .upsert_documents(vec![Document::new(title, file.relative_path.clone())])
            .await?;
        Ok(outcome)
    }
}

fn chunk_record(
    doc_id: &str,
    file: &SourceFile,
    title: &str,
    chunk: &TextChunk,
    embedding: Vec<f32>,
) -> ChunkRecord {
    let index = i64::try_from(chunk.chunk_index).unwrap_or(i64::MAX);
    let mut metadata = ChunkMetadata::new();
    metadata.insert("chunkIndex".into(), Value::from(index));
    metadata.insert("startChar".into(), Value::from(chunk.start_char));
    metadata.insert("endChar".into(), Value::from(chunk.end_char));
    metadata.insert("source".into(), Value::from(file.relative_path.as_str()));
    metadata.insert("title".into(), Value::from(title));

    ChunkRecord {
        id: make_chunk_id(doc_id, index),
        doc_id: doc_id.to_owned(),
        text: chunk.text.clone(),
        embedding,
        token_estimate: chunk.token_estimate,
        metadata,
    }
}
