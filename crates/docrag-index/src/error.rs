//! Error types for docrag-index.

/// Errors raised while chunking, ingesting or retrieving.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Chunking options that cannot produce bounded chunks.
    #[error("invalid chunk options: {field} {reason}")]
    InvalidOptions {
        field: &'static str,
        reason: &'static str,
    },

    /// IO error reading or walking the document source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// Embedding provider error.
    #[error("embedding error: {0}")]
    Llm(#[from] docrag_llm::LlmError),

    /// Vector store error.
    #[error("store error: {0}")]
    Store(#[from] docrag_memory::VectorStoreError),

    /// Document root missing or not a directory.
    #[error("document source not found: {}", .0.display())]
    SourceNotFound(std::path::PathBuf),

    #[error("file {} is {size} bytes, limit is {limit}", path.display())]
    FileTooLarge {
        path: std::path::PathBuf,
        size: u64,
        limit: u64,
    },
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
