//! Error types for the vectorization pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Server errors might be transient (e.g., 503 Service Unavailable)
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) | EmbeddingError::CountMismatch { .. } => false,
        }
    }
}

/// Errors raised while streaming content units through the provider.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("content unit {unit_id} (document {document_id}) has a non-text payload")]
    NonTextPayload {
        unit_id: String,
        document_id: String,
    },

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("task pool is full ({limit} batches in flight)")]
    PoolFull { limit: usize },

    #[error("batch task failed: {0}")]
    TaskFailed(String),

    #[error("vectorization run cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            PipelineError::Cancelled
        } else {
            PipelineError::TaskFailed(err.to_string())
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to reading content units from JSON Lines input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    ParseError {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_retryable() {
        assert!(EmbeddingError::ServerError("status 503: busy".to_string()).is_retryable());
        assert!(EmbeddingError::ServerError("Too Many Requests".to_string()).is_retryable());
        assert!(!EmbeddingError::ServerError("status 400: bad input".to_string()).is_retryable());
    }

    #[test]
    fn test_contract_violation_not_retryable() {
        let err = EmbeddingError::CountMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "embedding provider returned 3 vectors for 4 inputs"
        );
    }

    #[test]
    fn test_pipeline_error_wraps_embedding_error() {
        let err: PipelineError = EmbeddingError::Timeout.into();
        assert!(matches!(err, PipelineError::Embedding(EmbeddingError::Timeout)));
        assert_eq!(err.to_string(), "embedding error: embedding timeout");
    }
}
