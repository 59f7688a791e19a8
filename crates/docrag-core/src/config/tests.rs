use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 7] = [
    "DOCRAG_STORAGE_DIR",
    "DOCRAG_DOCUMENTS_DIR",
    "DOCRAG_OLLAMA_BASE_URL",
    "DOCRAG_EMBED_MODEL",
    "DOCRAG_EMBED_TIMEOUT",
    "DOCRAG_EMBED_CONCURRENCY",
    "DOCRAG_TOP_K",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.storage.dir, PathBuf::from("./data/storage"));
    assert_eq!(config.storage.file_name, "vector-store.json");
    assert!(config.storage.dimensions.is_none());
    assert_eq!(config.llm.base_url, "http://localhost:11435/api");
    assert_eq!(config.llm.embedding_model, "nomic-embed-text");
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.llm.max_retries, 2);
    assert_eq!(config.llm.retry_delay_ms, 300);
    assert_eq!(config.chunking.target_tokens, 600);
    assert_eq!(config.chunking.overlap_tokens, 80);
    assert_eq!(config.chunking.min_chunk_tokens, 200);
    assert_eq!(config.ingest.dir, PathBuf::from("./data/documents"));
    assert_eq!(config.ingest.embed_concurrency, 1);
    assert_eq!(config.ingest.extensions, ["md", "markdown", "txt"]);
    assert_eq!(config.retrieval.top_k, 8);
    assert!(config.validate().is_ok());
}

#[test]
fn storage_path_joins_dir_and_file() {
    let config = Config::default();
    assert_eq!(
        config.storage.path(),
        PathBuf::from("./data/storage/vector-store.json")
    );
}

#[test]
#[serial]
fn missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.retrieval.top_k, 8);
}

#[test]
#[serial]
fn parse_valid_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        r#"
[storage]
dir = "/var/lib/docrag"
dimensions = 768

[llm]
base_url = "http://ollama:11434"
embedding_model = "mxbai-embed-large"

[chunking]
target_tokens = 300
min_chunk_tokens = 100

[ingest]
dir = "./kb"
embed_concurrency = 4

[retrieval]
top_k = 5
"#
    )
    .unwrap();

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.storage.dir, PathBuf::from("/var/lib/docrag"));
    assert_eq!(config.storage.file_name, "vector-store.json");
    assert_eq!(config.storage.dimensions, Some(768));
    assert_eq!(config.llm.base_url, "http://ollama:11434");
    assert_eq!(config.llm.embedding_model, "mxbai-embed-large");
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.chunking.target_tokens, 300);
    assert_eq!(config.chunking.overlap_tokens, 80);
    assert_eq!(config.chunking.min_chunk_tokens, 100);
    assert_eq!(config.ingest.dir, PathBuf::from("./kb"));
    assert_eq!(config.ingest.embed_concurrency, 4);
    assert_eq!(config.retrieval.top_k, 5);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[retrieval]\ntop_k = \"many\"\n").unwrap();
    clear_env();

    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    unsafe {
        std::env::set_var("DOCRAG_STORAGE_DIR", "/tmp/store");
        std::env::set_var("DOCRAG_DOCUMENTS_DIR", "/tmp/docs");
        std::env::set_var("DOCRAG_OLLAMA_BASE_URL", "http://gpu-box:11434");
        std::env::set_var("DOCRAG_EMBED_MODEL", "all-minilm");
        std::env::set_var("DOCRAG_EMBED_TIMEOUT", "5");
        std::env::set_var("DOCRAG_EMBED_CONCURRENCY", "3");
        std::env::set_var("DOCRAG_TOP_K", "12");
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.storage.dir, PathBuf::from("/tmp/store"));
    assert_eq!(config.ingest.dir, PathBuf::from("/tmp/docs"));
    assert_eq!(config.llm.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.embedding_model, "all-minilm");
    assert_eq!(config.llm.timeout_secs, 5);
    assert_eq!(config.ingest.embed_concurrency, 3);
    assert_eq!(config.retrieval.top_k, 12);
}

#[test]
#[serial]
fn invalid_numeric_env_is_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("DOCRAG_EMBED_TIMEOUT", "soon");
        std::env::set_var("DOCRAG_TOP_K", "-1");
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.retrieval.top_k, 8);
}

#[test]
fn validate_rejects_bad_chunking() {
    let mut config = Config::default();
    config.chunking.min_chunk_tokens = config.chunking.target_tokens + 1;
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("min_chunk_tokens"));
}

#[test]
fn validate_rejects_zero_concurrency() {
    let mut config = Config::default();
    config.ingest.embed_concurrency = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("embed_concurrency"));
}

#[test]
fn validate_rejects_zero_top_k() {
    let mut config = Config::default();
    config.retrieval.top_k = 0;
    assert!(config.validate().is_err());
}

#[test]
fn serializes_back_to_toml() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.llm.base_url, config.llm.base_url);
    assert_eq!(parsed.chunking, config.chunking);
}
