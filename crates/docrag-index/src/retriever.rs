//! Query-time retrieval: embed, rank in the store, filter by tag, truncate.

use std::fmt::Write;
use std::sync::Arc;

use docrag_llm::EmbeddingProvider;
use docrag_memory::{ChunkMetadata, ChunkRecord, ScoredChunk, VectorStore, VectorStoreFilter};

use crate::error::Result;

/// Widening factor for the store query when hits are post-filtered by tag.
const TAG_CANDIDATE_FACTOR: usize = 4;

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub top_k: usize,
    /// Exact match on the owning document's `source`.
    pub source: Option<String>,
    /// Every tag must be present in the chunk's `tags` metadata. Empty means no tag filter.
    pub tags: Vec<String>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: 8,
            source: None,
            tags: Vec::new(),
        }
    }
}

impl RetrieveOptions {
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
    pub chunk_id: String,
}

impl From<ScoredChunk> for RetrievedChunk {
    fn from(hit: ScoredChunk) -> Self {
        Self {
            text: hit.chunk.text,
            metadata: hit.chunk.metadata,
            score: hit.score,
            chunk_id: hit.chunk.id,
        }
    }
}

pub struct Retriever<P: EmbeddingProvider> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
}

impl<P: EmbeddingProvider> Retriever<P> {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Rank stored chunks against `query`, best first.
    ///
    /// A zero `top_k` or a provider that returns no vector yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding call or the store query fails.
    pub async fn retrieve(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<RetrievedChunk>> {
        let top_k = options.top_k;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let Some(embedding) = self.provider.embed(query).await?.into_iter().next() else {
            tracing::debug!("no query embedding returned");
            return Ok(Vec::new());
        };

        let filter = options.source.clone().map(VectorStoreFilter::by_source);
        let candidates = if options.tags.is_empty() {
            top_k
        } else {
            top_k.saturating_mul(TAG_CANDIDATE_FACTOR).max(top_k)
        };

        let mut hits: Vec<ScoredChunk> = self
            .store
            .query_by_embedding(embedding, candidates, filter)
            .await?
            .into_iter()
            .filter(|hit| has_tags(&hit.chunk, &options.tags))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        tracing::debug!(
            candidates,
            returned = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieval finished"
        );
        Ok(hits.into_iter().map(RetrievedChunk::from).collect())
    }
}

fn has_tags(chunk: &ChunkRecord, required: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    let Some(tags) = chunk.tags() else {
        return false;
    };
    required.iter().all(|tag| tags.contains(&tag.as_str()))
}

/// Render hits as a `<context>` block for prompt injection.
#[must_use]
pub fn format_as_context(hits: &[RetrievedChunk]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut out = String::from("<context>\n");
    for hit in hits {
        let source = hit
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let index = hit
            .metadata
            .get("chunkIndex")
            .and_then(serde_json::Value::as_i64)
            .map_or_else(|| "?".to_owned(), |i| i.to_string());
        let _ = writeln!(
            out,
            "  <chunk source=\"{source}\" chunk=\"{index}\" score=\"{:.3}\">",
            hit.score,
        );
        out.push_str(&hit.text);
        out.push_str("\n  </chunk>\n");
    }
    out.push_str("</context>");
    out
}
