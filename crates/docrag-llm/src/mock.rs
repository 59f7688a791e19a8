//! Test-only mock embedding provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

type EmbedFn = Arc<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

#[derive(Clone)]
pub struct MockEmbedder {
    embed_fn: EmbedFn,
    /// Return no vectors at all, as a provider with nothing to say would.
    pub empty: bool,
    pub fail: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
    calls: Arc<AtomicUsize>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::fixed(vec![0.0; 8])
    }
}

impl std::fmt::Debug for MockEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEmbedder")
            .field("empty", &self.empty)
            .field("fail", &self.fail)
            .field("delay_ms", &self.delay_ms)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl MockEmbedder {
    /// Always return the same vector.
    #[must_use]
    pub fn fixed(embedding: Vec<f32>) -> Self {
        Self::from_fn(move |_| embedding.clone())
    }

    /// Compute the vector from the input text.
    #[must_use]
    pub fn from_fn(f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            embed_fn: Arc::new(f),
            empty: false,
            fail: false,
            delay_ms: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Number of `embed_batch` calls observed so far, shared across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for MockEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(inputs.iter().map(|text| (self.embed_fn)(text)).collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
