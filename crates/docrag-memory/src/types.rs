use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form chunk metadata. Ingestion always writes `chunkIndex`, `startChar`,
/// `endChar`, `source` and `title`; `tags` is optional.
pub type ChunkMetadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    /// A document with its canonical id; timestamps are stamped by the store on upsert.
    #[must_use]
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        let title = title.into();
        let source = source.into();
        Self {
            id: make_doc_id(&source, &title),
            title,
            source,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub token_estimate: usize,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    /// `chunkIndex` metadata, when present and integral (`2` and `2.0` both count).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn chunk_index(&self) -> Option<i64> {
        let value = self.metadata.get("chunkIndex")?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    /// String entries of the `tags` metadata array; `None` when `tags` is not an array.
    #[must_use]
    pub fn tags(&self) -> Option<Vec<&str>> {
        let tags = self.metadata.get("tags")?.as_array()?;
        Some(tags.iter().filter_map(Value::as_str).collect())
    }
}

fn stable_hash(value: &str) -> String {
    blake3::hash(value.as_bytes()).to_hex().to_string()
}

#[must_use]
pub fn make_doc_id(source: &str, title: &str) -> String {
    stable_hash(&format!("{source}::{title}"))
}

#[must_use]
pub fn make_chunk_id(doc_id: &str, chunk_index: i64) -> String {
    stable_hash(&format!("{doc_id}::{chunk_index}"))
}
