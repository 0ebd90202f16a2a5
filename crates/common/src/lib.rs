//! Vigil Common Library
//!
//! Shared code for the Vigil RAG pipeline including:
//! - Error types and handling
//! - Configuration management
//! - Embedding client abstraction
//! - Vector store client abstraction
//! - Generative LLM client abstraction
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod vectorstore;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::{LlmClient, TokenStream};
pub use vectorstore::{ScoredRecord, VectorStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "multilingual-e5-large";

/// Default embedding dimension (the index is keyed to this)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
