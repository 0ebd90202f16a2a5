//! Vector store client abstraction
//!
//! The index is partitioned into named namespaces; records are immutable
//! once stored and owned exclusively by the store. Queries return scored
//! matches ordered by similarity; an absent namespace yields an empty match
//! list, never an error.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;

/// Record metadata: string keys to arbitrary JSON values
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored vector with its metadata, as written at ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A query match: record plus transient similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Trait for namespaced nearest-neighbor stores
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Query a namespace for the top_k nearest neighbors of an embedding
    async fn query(
        &self,
        embedding: &[f32],
        namespace: &str,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredRecord>>;

    /// Upsert a batch of vectors into a namespace, returning the count written
    async fn upsert(&self, entries: &[VectorEntry], namespace: &str) -> Result<usize>;
}

/// Derive a deterministic vector ID from record metadata.
///
/// Ingestion re-runs over the same source data must overwrite rather than
/// duplicate, so IDs are content-derived instead of random.
pub fn content_id(metadata: &Metadata) -> String {
    let canonical = serde_json::Value::Object(metadata.clone()).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..16])
}

/// Upsert entries in fixed-size batches (shared contract with ingestion)
pub async fn upsert_batched(
    store: &dyn VectorStore,
    entries: &[VectorEntry],
    namespace: &str,
    batch_size: usize,
) -> Result<usize> {
    let mut written = 0;
    for batch in entries.chunks(batch_size.max(1)) {
        written += store.upsert(batch, namespace).await?;
        tracing::debug!(namespace, batch = batch.len(), written, "Upserted batch");
    }
    Ok(written)
}

/// Pinecone-style data-plane client
pub struct PineconeStore {
    client: reqwest::Client,
    index_host: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeStore {
    /// Create a new client against an index data-plane host
    pub fn new(index_host: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            index_host: index_host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.index_host, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("Api-Key", key);
        }
        builder
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(
        &self,
        embedding: &[f32],
        namespace: &str,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredRecord>> {
        let request = QueryRequest {
            vector: embedding,
            top_k,
            namespace,
            include_metadata,
        };

        let response = self
            .request("/query")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::VectorStoreError {
                message: format!("Query request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreError {
                message: format!("Query error {}: {}", status, body),
            });
        }

        let result: QueryResponse =
            response.json().await.map_err(|e| AppError::VectorStoreError {
                message: format!("Failed to parse query response: {}", e),
            })?;

        Ok(result
            .matches
            .into_iter()
            .map(|m| ScoredRecord {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn upsert(&self, entries: &[VectorEntry], namespace: &str) -> Result<usize> {
        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|e| UpsertVector {
                    id: &e.id,
                    values: &e.embedding,
                    metadata: &e.metadata,
                })
                .collect(),
            namespace,
        };

        let response = self
            .request("/vectors/upsert")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::VectorStoreError {
                message: format!("Upsert request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreError {
                message: format!("Upsert error {}: {}", status, body),
            });
        }

        let result: UpsertResponse =
            response.json().await.map_err(|e| AppError::VectorStoreError {
                message: format!("Failed to parse upsert response: {}", e),
            })?;

        Ok(result.upserted_count)
    }
}

/// In-memory store for tests and local development
#[derive(Default)]
pub struct MemoryVectorStore {
    namespaces: tokio::sync::RwLock<HashMap<String, Vec<VectorEntry>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn query(
        &self,
        embedding: &[f32],
        namespace: &str,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredRecord>> {
        let namespaces = self.namespaces.read().await;

        // An unknown namespace is an empty partition, not an error
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredRecord> = entries
            .iter()
            .map(|e| ScoredRecord {
                id: e.id.clone(),
                score: dot(embedding, &e.embedding),
                metadata: if include_metadata {
                    e.metadata.clone()
                } else {
                    Metadata::new()
                },
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn upsert(&self, entries: &[VectorEntry], namespace: &str) -> Result<usize> {
        let mut namespaces = self.namespaces.write().await;
        let stored = namespaces.entry(namespace.to_string()).or_default();

        for entry in entries {
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => stored.push(entry.clone()),
            }
        }

        Ok(entries.len())
    }
}
