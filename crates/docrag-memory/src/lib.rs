//! Document and chunk storage with brute-force cosine ranking.
//!
//! The [`VectorStore`] trait is the seam between ingestion/retrieval and the
//! backing storage; [`JsonVectorStore`] keeps everything in memory and writes a
//! single JSON snapshot through on every mutation.

pub mod json_store;
pub mod similarity;
pub mod tokens;
pub mod types;
pub mod vector_store;

pub use json_store::{JsonVectorStore, STORAGE_FILE_NAME, StoreConfig, StoreStats};
pub use tokens::estimate_tokens;
pub use types::{ChunkMetadata, ChunkRecord, Document, make_chunk_id, make_doc_id};
pub use vector_store::{BoxFuture, ScoredChunk, VectorStore, VectorStoreError, VectorStoreFilter};
