//! Multi-namespace retrieval
//!
//! Embeds the refined query once, fans the same vector out across every
//! configured namespace concurrently, and applies the minimum-score cutoff
//! per namespace. The score filter is a hard invariant: no record below
//! `min_score` ever reaches context assembly.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use vigil_common::embeddings::Embedder;
use vigil_common::errors::Result;
use vigil_common::metrics::record_retrieval;
use vigil_common::vectorstore::{ScoredRecord, VectorStore};

/// Namespace -> filtered, score-ordered records
pub type RetrievalResult = HashMap<String, Vec<ScoredRecord>>;

/// Drives the vector store across a set of namespaces
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve top_k records per namespace, dropping any below min_score.
    ///
    /// Namespaces absent from the index yield empty sequences, not errors.
    /// Any upstream failure (embedding or store) aborts the whole call.
    pub async fn retrieve(
        &self,
        refined_query: &str,
        namespaces: &[String],
        min_score: f32,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let start = Instant::now();

        // The query text is identical for every namespace; embed once
        let embedding = self.embedder.embed(refined_query).await?;

        // Fan-out across namespaces, fan-in before assembly
        let queries = namespaces.iter().map(|namespace| {
            let embedding = &embedding;
            async move {
                let records = self.store.query(embedding, namespace, top_k, true).await?;
                Ok::<_, vigil_common::errors::AppError>((namespace.clone(), records))
            }
        });

        let mut results = RetrievalResult::with_capacity(namespaces.len());
        for (namespace, records) in try_join_all(queries).await? {
            let total = records.len();
            let kept: Vec<ScoredRecord> = records
                .into_iter()
                .filter(|r| r.score >= min_score)
                .collect();

            tracing::debug!(
                namespace = %namespace,
                total,
                kept = kept.len(),
                min_score,
                "Namespace retrieval complete"
            );
            record_retrieval(start.elapsed().as_secs_f64(), &namespace, kept.len());

            results.insert(namespace, kept);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vigil_common::embeddings::MockEmbedder;
    use vigil_common::errors::AppError;
    use vigil_common::vectorstore::Metadata;

    /// Store returning canned scores per namespace
    struct StubStore {
        scores: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl VectorStore for StubStore {
        async fn query(
            &self,
            _embedding: &[f32],
            namespace: &str,
            top_k: usize,
            _include_metadata: bool,
        ) -> Result<Vec<ScoredRecord>> {
            let scores = self.scores.get(namespace).cloned().unwrap_or_default();
            Ok(scores
                .into_iter()
                .take(top_k)
                .enumerate()
                .map(|(i, score)| ScoredRecord {
                    id: format!("{}-{}", namespace, i),
                    score,
                    metadata: Metadata::new(),
                })
                .collect())
        }

        async fn upsert(
            &self,
            _entries: &[vigil_common::vectorstore::VectorEntry],
            _namespace: &str,
        ) -> Result<usize> {
            Ok(0)
        }
    }

    /// Store that always fails; retrieval must abort, not degrade
    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn query(
            &self,
            _embedding: &[f32],
            _namespace: &str,
            _top_k: usize,
            _include_metadata: bool,
        ) -> Result<Vec<ScoredRecord>> {
            Err(AppError::VectorStoreError {
                message: "index unreachable".into(),
            })
        }

        async fn upsert(
            &self,
            _entries: &[vigil_common::vectorstore::VectorEntry],
            _namespace: &str,
        ) -> Result<usize> {
            Ok(0)
        }
    }

    fn retriever(scores: HashMap<String, Vec<f32>>) -> Retriever {
        Retriever::new(
            Arc::new(MockEmbedder::new(8)),
            Arc::new(StubStore { scores }),
        )
    }

    #[tokio::test]
    async fn test_min_score_is_a_hard_filter() {
        let r = retriever(HashMap::from([(
            "mitre_attack".to_string(),
            vec![0.9, 0.8, 0.6],
        )]));

        let results = r
            .retrieve("apt28", &["mitre_attack".to_string()], 0.75, 5)
            .await
            .unwrap();

        let kept = &results["mitre_attack"];
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.8);
        assert!(kept.iter().all(|r| r.score >= 0.75));
    }

    #[tokio::test]
    async fn test_missing_namespace_yields_empty() {
        let r = retriever(HashMap::new());

        let results = r
            .retrieve("apt28", &["nonexistent".to_string()], 0.5, 5)
            .await
            .unwrap();

        assert!(results["nonexistent"].is_empty());
    }

    #[tokio::test]
    async fn test_every_namespace_present_in_result() {
        let r = retriever(HashMap::from([
            ("mitre_attack".to_string(), vec![0.9]),
            ("exploit_db".to_string(), vec![0.8]),
        ]));

        let namespaces = vec!["mitre_attack".to_string(), "exploit_db".to_string()];
        let results = r.retrieve("apt28", &namespaces, 0.5, 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("mitre_attack"));
        assert!(results.contains_key("exploit_db"));
    }

    #[tokio::test]
    async fn test_store_failure_aborts_retrieval() {
        let r = Retriever::new(Arc::new(MockEmbedder::new(8)), Arc::new(FailingStore));

        let err = r
            .retrieve("apt28", &["mitre_attack".to_string()], 0.5, 5)
            .await
            .unwrap_err();

        assert!(err.is_upstream());
    }
}
