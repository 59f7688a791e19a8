//! Service wiring: config resolution, store, embedder, pipeline and retriever construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use docrag_index::{IngestOptions, IngestionPipeline, PipelineConfig, Retriever};
use docrag_llm::EmbeddingProvider;
use docrag_llm::ollama::OllamaEmbedder;
use docrag_memory::{JsonVectorStore, StoreConfig};

use crate::config::Config;

/// Priority: explicit path (CLI `--config`) > `DOCRAG_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DOCRAG_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

#[must_use]
pub fn create_embedder(config: &Config) -> OllamaEmbedder {
    tracing::debug!(
        base_url = %config.llm.base_url,
        model = %config.llm.embedding_model,
        "using ollama embeddings"
    );
    OllamaEmbedder::new(&config.llm.base_url, config.llm.embedding_model.clone())
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))
        .with_retries(
            config.llm.max_retries,
            Duration::from_millis(config.llm.retry_delay_ms),
        )
}

/// # Errors
///
/// Returns an error if an existing snapshot cannot be read or parsed.
pub fn open_store(config: &Config) -> anyhow::Result<JsonVectorStore> {
    let mut store_config = StoreConfig::new(config.storage.path());
    if let Some(dimensions) = config.storage.dimensions {
        store_config = store_config.with_dimensions(dimensions);
    }
    JsonVectorStore::open(store_config).with_context(|| {
        format!(
            "failed to open vector store at {}",
            config.storage.path().display()
        )
    })
}

/// Store and embedder shared by ingestion and retrieval.
pub struct Services<P: EmbeddingProvider> {
    config: Config,
    store: Arc<JsonVectorStore>,
    provider: Arc<P>,
}

impl Services<OllamaEmbedder> {
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the store cannot be opened.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let provider = create_embedder(&config);
        Self::with_provider(config, provider)
    }
}

impl<P: EmbeddingProvider> Services<P> {
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the store cannot be opened.
    pub fn with_provider(config: Config, provider: P) -> anyhow::Result<Self> {
        config.validate()?;
        let store = open_store(&config)?;
        Ok(Self {
            config,
            store: Arc::new(store),
            provider: Arc::new(provider),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<JsonVectorStore> {
        &self.store
    }

    /// # Errors
    ///
    /// Returns an error if the chunking or concurrency settings are rejected.
    pub fn pipeline(&self) -> anyhow::Result<IngestionPipeline<P>> {
        let config = PipelineConfig {
            chunking: self.config.chunking,
            embed_concurrency: self.config.ingest.embed_concurrency,
            extensions: self.config.ingest.extensions.clone(),
            max_file_size: self.config.ingest.max_file_size,
        };
        let pipeline = IngestionPipeline::new(self.store.clone(), Arc::clone(&self.provider), config)?
            .with_storage_path(self.store.path());
        Ok(pipeline)
    }

    #[must_use]
    pub fn retriever(&self) -> Retriever<P> {
        Retriever::new(self.store.clone(), Arc::clone(&self.provider))
    }

    /// Ingest options for the configured documents directory, optionally overridden.
    #[must_use]
    pub fn ingest_options(&self, dir: Option<&Path>) -> IngestOptions {
        IngestOptions::new(dir.map_or_else(|| self.config.ingest.dir.clone(), Path::to_path_buf))
    }
}

#[cfg(test)]
mod tests {
    use docrag_index::RetrieveOptions;
    use docrag_llm::mock::MockEmbedder;
    use serial_test::serial;

    use super::*;

    fn config_in(storage: &Path, docs: &Path) -> Config {
        let mut config = Config::default();
        config.storage.dir = storage.to_path_buf();
        config.ingest.dir = docs.to_path_buf();
        config
    }

    #[test]
    #[serial]
    fn resolve_config_path_priority() {
        unsafe { std::env::remove_var("DOCRAG_CONFIG") };
        assert_eq!(
            resolve_config_path(None),
            PathBuf::from("config/default.toml")
        );

        unsafe { std::env::set_var("DOCRAG_CONFIG", "/etc/docrag.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/docrag.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("custom.toml"))),
            PathBuf::from("custom.toml")
        );
        unsafe { std::env::remove_var("DOCRAG_CONFIG") };
    }

    #[test]
    fn create_embedder_uses_config() {
        let mut config = Config::default();
        config.llm.embedding_model = "all-minilm".into();
        let embedder = create_embedder(&config);
        assert_eq!(embedder.model(), "all-minilm");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), dir.path());
        config.ingest.embed_concurrency = 0;
        assert!(Services::with_provider(config, MockEmbedder::default()).is_err());
    }

    #[test]
    fn corrupt_store_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vector-store.json"), "[").unwrap();
        let config = config_in(dir.path(), dir.path());
        let err = Services::with_provider(config, MockEmbedder::default())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("failed to open vector store"));
    }

    #[tokio::test]
    async fn ingest_then_retrieve() {
        let storage = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        std::fs::write(docs.path().join("a.md"), "alpha content").unwrap();

        let config = config_in(storage.path(), docs.path());
        let services = Services::with_provider(config, MockEmbedder::fixed(vec![1.0, 0.0])).unwrap();
        let report = services
            .pipeline()
            .unwrap()
            .ingest(&services.ingest_options(None))
            .await
            .unwrap();
        assert_eq!(report.docs_ingested, 1);
        assert_eq!(
            report.storage_path.as_deref(),
            Some(storage.path().join("vector-store.json").as_path())
        );

        let hits = services
            .retriever()
            .retrieve("alpha", &RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "alpha content");
    }
}
