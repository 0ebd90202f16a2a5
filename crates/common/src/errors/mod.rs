//! Error types for the Vigil pipeline
//!
//! Provides a small error taxonomy with one hard rule: any failure of an
//! upstream service below the generation boundary (embedding, vector store,
//! rewrite, generation) is fatal for the in-flight query. No partial answer
//! is ever returned. The one locally-recovered failure class, artifact
//! fetches, never surfaces here at all - the fetcher degrades to an empty
//! string instead.

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Upstream service errors - all fatal for the query
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Vector store error: {message}")]
    VectorStoreError { message: String },

    #[error("Generation service error: {message}")]
    GenerationError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error came from an upstream service call
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingError { .. }
                | AppError::VectorStoreError { .. }
                | AppError::GenerationError { .. }
                | AppError::HttpClient(_)
        )
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::EmbeddingError { .. } => "embedding",
            AppError::VectorStoreError { .. } => "vector_store",
            AppError::GenerationError { .. } => "generation",
            AppError::HttpClient(_) => "http",
            AppError::Internal { .. } => "internal",
            AppError::Configuration { .. } => "configuration",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        let err = AppError::VectorStoreError {
            message: "index unreachable".into(),
        };
        assert!(err.is_upstream());
        assert_eq!(err.kind(), "vector_store");
    }

    #[test]
    fn test_internal_not_upstream() {
        let err = AppError::Configuration {
            message: "missing API key".into(),
        };
        assert!(!err.is_upstream());
        assert_eq!(err.kind(), "configuration");
    }
}
