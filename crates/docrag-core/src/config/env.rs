use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DOCRAG_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DOCRAG_DOCUMENTS_DIR") {
            self.ingest.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DOCRAG_OLLAMA_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_EMBED_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("DOCRAG_EMBED_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                self.llm.timeout_secs = secs;
            } else {
                tracing::warn!("ignoring invalid DOCRAG_EMBED_TIMEOUT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCRAG_EMBED_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                self.ingest.embed_concurrency = n;
            } else {
                tracing::warn!("ignoring invalid DOCRAG_EMBED_CONCURRENCY value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCRAG_TOP_K") {
            if let Ok(k) = v.parse::<usize>() {
                self.retrieval.top_k = k;
            } else {
                tracing::warn!("ignoring invalid DOCRAG_TOP_K value: {v}");
            }
        }
    }
}
