use std::time::Duration;

use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, validate_embeddings};

const DEFAULT_PORT: u16 = 11434;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Embedding client for a local Ollama server (`/api/embed`).
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        let (host, port) = parse_base_url(base_url);
        Self {
            client: Ollama::new(host, port),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Per-attempt deadline for a single embedding request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry failed requests up to `max_retries` times, waiting `delay * attempt` between them.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request_once(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Multiple(inputs.to_vec()),
        );

        let response = tokio::time::timeout(self.timeout, self.client.generate_embeddings(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: "ollama",
                elapsed: self.timeout,
            })?
            .map_err(|e| LlmError::Other(format!("Ollama embedding request failed: {e}")))?;

        validate_embeddings(response.embeddings)
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        loop {
            match self.request_once(inputs).await {
                Ok(vectors) => return Ok(vectors),
                // Malformed vectors will not improve on retry.
                Err(e @ LlmError::InvalidResponse(_)) => return Err(e),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        model = %self.model,
                        attempt,
                        max_retries = self.max_retries,
                        "embedding request failed, retrying in {}ms: {e}",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/// Split an Ollama base URL into host and port, tolerating a trailing `/` and an `/api` suffix.
fn parse_base_url(url: &str) -> (String, u16) {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix("/api").unwrap_or(url);
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), DEFAULT_PORT)
}
