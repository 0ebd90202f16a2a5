//! Configuration management for the Vigil pipeline
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Retrieval and generation parameters
    pub rag: RagConfig,

    /// Vector store (index) configuration
    pub vector_store: VectorStoreConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Generative LLM configuration
    pub llm: LlmConfig,

    /// Code artifact fetching configuration
    pub artifact: ArtifactConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Ordered namespace list. Order drives context assembly order.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,

    /// Namespaces whose records carry `file` references to hydrate
    #[serde(default = "default_hydrated_namespaces")]
    pub hydrated_namespaces: Vec<String>,

    /// Minimum similarity score; records below it are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Nearest neighbors requested per namespace
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Generation temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Index data-plane host, e.g. https://vigil-xxxx.svc.aped-4627-b74a.pinecone.io
    pub index_host: String,

    /// Index name
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// API key for the vector store service
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Batch size for upsert operations
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// API base URL for the embedding service
    pub api_base: Option<String>,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match the index)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API base URL for the generative language service
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key for the generative language service
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactConfig {
    /// Raw-content base URL that `file` metadata paths are templated into
    #[serde(default = "default_code_base_url")]
    pub code_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_artifact_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_namespaces() -> Vec<String> {
    vec!["mitre_attack".to_string(), "exploit_db".to_string()]
}
fn default_hydrated_namespaces() -> Vec<String> {
    vec!["exploit_db".to_string()]
}
fn default_min_score() -> f32 { 0.75 }
fn default_top_k() -> usize { 5 }
fn default_temperature() -> f32 { 0.8 }
fn default_index_name() -> String { "vigil".to_string() }
fn default_store_timeout() -> u64 { 30 }
fn default_upsert_batch_size() -> usize { 127 }
fn default_embedding_model() -> String { "multilingual-e5-large".to_string() }
fn default_embedding_dimension() -> usize { 1024 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_llm_base_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_llm_model() -> String { "gemini-2.0-flash".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_code_base_url() -> String {
    "https://gitlab.com/exploit-database/exploitdb/-/raw/main".to_string()
}
fn default_artifact_timeout() -> u64 { 15 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "vigil".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RAG__MIN_SCORE=0.8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the vector store timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.vector_store.timeout_secs)
    }

    /// Get the generation timeout as Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rag: RagConfig {
                namespaces: default_namespaces(),
                hydrated_namespaces: default_hydrated_namespaces(),
                min_score: default_min_score(),
                top_k: default_top_k(),
                temperature: default_temperature(),
            },
            vector_store: VectorStoreConfig {
                index_host: "http://localhost:5080".to_string(),
                index_name: default_index_name(),
                api_key: None,
                timeout_secs: default_store_timeout(),
                upsert_batch_size: default_upsert_batch_size(),
            },
            embedding: EmbeddingConfig {
                api_base: None,
                api_key: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
            },
            llm: LlmConfig {
                base_url: default_llm_base_url(),
                api_key: None,
                model: default_llm_model(),
                timeout_secs: default_llm_timeout(),
            },
            artifact: ArtifactConfig {
                code_base_url: default_code_base_url(),
                timeout_secs: default_artifact_timeout(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}
