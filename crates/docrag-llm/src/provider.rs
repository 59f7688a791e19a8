use std::future::Future;

use crate::error::LlmError;

pub trait EmbeddingProvider: Send + Sync {
    /// Embed every input string, returning one vector per input in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or returns malformed vectors.
    fn embed_batch(
        &self,
        inputs: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Embed a single string. The result may be empty when the provider produced no vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or returns malformed vectors.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        let inputs = vec![text.to_owned()];
        async move { self.embed_batch(&inputs).await }
    }

    fn name(&self) -> &'static str;
}

/// Reject vectors containing NaN or infinite entries.
///
/// # Errors
///
/// Returns `LlmError::InvalidResponse` naming the first offending `[vector][entry]` position.
pub fn validate_embeddings(vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>, LlmError> {
    for (i, vector) in vectors.iter().enumerate() {
        if let Some(j) = vector.iter().position(|v| !v.is_finite()) {
            return Err(LlmError::InvalidResponse(format!(
                "embeddings[{i}][{j}] is not a finite number"
            )));
        }
    }
    Ok(vectors)
}
