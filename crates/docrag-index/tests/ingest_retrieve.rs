use std::path::Path;
use std::sync::Arc;

use docrag_index::{
    IndexError, IngestOptions, IngestionPipeline, PipelineConfig, RetrieveOptions, Retriever,
};
use docrag_llm::mock::MockEmbedder;
use docrag_memory::{
    ChunkMetadata, ChunkRecord, Document, JsonVectorStore, StoreConfig, VectorStore,
};
use serde_json::json;

fn open_store(dir: &Path) -> Arc<JsonVectorStore> {
    Arc::new(JsonVectorStore::open(StoreConfig::in_dir(dir)).unwrap())
}

fn write_docs(root: &Path) {
    std::fs::create_dir_all(root.join("guides")).unwrap();
    std::fs::write(
        root.join("guides/setup.md"),
        "# Setup\n\nInstall the toolchain.\n\n\n\nThen run the tests.",
    )
    .unwrap();
    std::fs::write(root.join("faq.txt"), "Q: Where is the data?\nA: In ./data.").unwrap();
    std::fs::write(root.join("notes.rst"), "ignored").unwrap();
}

/// Embeds by keyword so retrieval order is predictable.
fn keyword_embedder() -> MockEmbedder {
    MockEmbedder::from_fn(|text| {
        let lower = text.to_lowercase();
        vec![
            if lower.contains("install") { 1.0 } else { 0.1 },
            if lower.contains("data") { 1.0 } else { 0.1 },
        ]
    })
}

#[tokio::test]
async fn reingesting_same_directory_is_idempotent() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    write_docs(docs.path());

    let store = open_store(storage.path());
    let pipeline =
        IngestionPipeline::new(store.clone(), Arc::new(keyword_embedder()), PipelineConfig::default())
            .unwrap();

    let first = pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();
    let after_first = store.stats().unwrap();
    let second = pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();
    let after_second = store.stats().unwrap();

    assert_eq!(first.files_scanned, 2);
    assert_eq!(first.docs_ingested, 2);
    assert_eq!(first.docs_ingested, second.docs_ingested);
    assert_eq!(first.chunks_ingested, second.chunks_ingested);
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.documents, 2);

    let reopened = open_store(storage.path());
    assert_eq!(reopened.stats().unwrap(), after_second);
}

#[tokio::test]
async fn ingested_chunks_are_retrievable_by_source() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    write_docs(docs.path());

    let store = open_store(storage.path());
    let provider = Arc::new(keyword_embedder());
    let pipeline =
        IngestionPipeline::new(store.clone(), provider.clone(), PipelineConfig::default()).unwrap();
    pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();

    let retriever = Retriever::new(store, provider);
    let hits = retriever
        .retrieve("how do I install?", &RetrieveOptions::default())
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].metadata["source"], json!("guides/setup.md"));
    assert!(hits[0].score >= hits[1].score);

    let options = RetrieveOptions {
        source: Some("faq.txt".into()),
        ..RetrieveOptions::default()
    };
    let hits = retriever.retrieve("how do I install?", &options).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata["title"], json!("faq.txt"));
}

#[tokio::test]
async fn tag_and_source_filters_combine() {
    let storage = tempfile::tempdir().unwrap();
    let store = open_store(storage.path());
    let a = Document::new("a.md", "docs/a.md");
    let b = Document::new("b.md", "docs/b.md");
    store.upsert_documents(vec![a.clone(), b.clone()]).await.unwrap();

    let record = |doc: &Document, embedding: Vec<f32>, tags: Option<serde_json::Value>| {
        let mut metadata = ChunkMetadata::new();
        metadata.insert("chunkIndex".into(), json!(0));
        metadata.insert("source".into(), json!(doc.source));
        if let Some(tags) = tags {
            metadata.insert("tags".into(), tags);
        }
        ChunkRecord {
            id: String::new(),
            doc_id: doc.id.clone(),
            text: format!("chunk of {}", doc.source),
            embedding,
            token_estimate: 4,
            metadata,
        }
    };
    store
        .upsert_chunks(vec![
            record(&a, vec![0.6, 0.8], Some(json!(["guide"]))),
            record(&b, vec![1.0, 0.0], None),
        ])
        .await
        .unwrap();

    let retriever = Retriever::new(store, Arc::new(MockEmbedder::fixed(vec![1.0, 0.0])));
    let options = RetrieveOptions {
        top_k: 1,
        source: Some("docs/a.md".into()),
        tags: vec!["guide".into()],
    };
    let hits = retriever.retrieve("x", &options).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "chunk of docs/a.md");

    let untagged_only = RetrieveOptions {
        top_k: 5,
        source: Some("docs/b.md".into()),
        tags: vec!["guide".into()],
    };
    assert!(retriever.retrieve("x", &untagged_only).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_and_whitespace_files_are_skipped() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("empty.md"), "").unwrap();
    std::fs::write(docs.path().join("blank.txt"), "  \n\n\t\r\n ").unwrap();

    let store = open_store(storage.path());
    let provider = Arc::new(MockEmbedder::default());
    let pipeline =
        IngestionPipeline::new(store.clone(), provider.clone(), PipelineConfig::default()).unwrap();
    let report = pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();

    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.docs_ingested, 0);
    assert_eq!(report.docs_skipped, 2);
    assert_eq!(provider.calls(), 0);
    assert_eq!(store.stats().unwrap().documents, 0);
}

#[tokio::test]
async fn embedding_failures_skip_chunks_without_aborting() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    write_docs(docs.path());

    let store = open_store(storage.path());
    let pipeline = IngestionPipeline::new(
        store.clone(),
        Arc::new(MockEmbedder::failing()),
        PipelineConfig::default(),
    )
    .unwrap();
    let report = pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();

    assert_eq!(report.docs_ingested, 0);
    assert_eq!(report.docs_skipped, 2);
    assert_eq!(report.chunks_skipped, 2);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(store.stats().unwrap().documents, 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn provider_without_vectors_skips_chunks_silently() {
    let docs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    write_docs(docs.path());

    let store = open_store(storage.path());
    let pipeline = IngestionPipeline::new(
        store.clone(),
        Arc::new(MockEmbedder::empty()),
        PipelineConfig::default(),
    )
    .unwrap();
    let report = pipeline.ingest(&IngestOptions::new(docs.path())).await.unwrap();

    assert_eq!(report.chunks_ingested, 0);
    assert_eq!(report.chunks_skipped, 2);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn retrieve_degenerate_cases() {
    let storage = tempfile::tempdir().unwrap();
    let store = open_store(storage.path());

    let provider = Arc::new(MockEmbedder::fixed(vec![1.0]));
    let retriever = Retriever::new(store.clone(), provider.clone());
    let zero = RetrieveOptions::default().with_top_k(0);
    assert!(retriever.retrieve("q", &zero).await.unwrap().is_empty());
    assert_eq!(provider.calls(), 0);

    let retriever = Retriever::new(store.clone(), Arc::new(MockEmbedder::empty()));
    assert!(
        retriever
            .retrieve("q", &RetrieveOptions::default())
            .await
            .unwrap()
            .is_empty()
    );

    let retriever = Retriever::new(store, Arc::new(MockEmbedder::failing()));
    let err = retriever
        .retrieve("q", &RetrieveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Llm(_)));
}
