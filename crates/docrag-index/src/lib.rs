//! Token-aware chunking, document ingestion and semantic retrieval.
//!
//! Documents are normalized and split into overlapping chunks, embedded through
//! an [`docrag_llm::EmbeddingProvider`], and stored in a
//! [`docrag_memory::VectorStore`]; the retriever ranks them against a query.

pub mod chunker;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod retriever;

pub use chunker::{ChunkOptions, TextChunk, TextChunker, chunk_text, normalize_text};
pub use error::{IndexError, Result};
pub use loader::{DirectorySource, DocumentSource, SourceFile};
pub use pipeline::{IngestOptions, IngestReport, IngestionPipeline, PipelineConfig};
pub use retriever::{RetrieveOptions, RetrievedChunk, Retriever, format_as_context};
