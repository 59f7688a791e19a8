use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Malformed or non-numeric vector data.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("request to {provider} timed out after {}ms", .elapsed.as_millis())]
    Timeout {
        provider: &'static str,
        elapsed: Duration,
    },

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_includes_provider_and_millis() {
        let err = LlmError::Timeout {
            provider: "ollama",
            elapsed: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "request to ollama timed out after 30000ms");
    }
}
