//! The query surface: rewrite -> retrieve -> assemble -> generate
//!
//! One `RagPipeline` serves many concurrent queries; it holds no mutable
//! state of its own, only shared service clients. Each query is a strictly
//! sequential, single-flight chain through the stages.

use crate::artifact::ArtifactSource;
use crate::context::ContextAssembler;
use crate::generate::{GenerationEngine, GenerationRequest};
use crate::retrieval::Retriever;
use crate::rewrite::QueryRewriter;
use std::sync::Arc;
use vigil_common::config::RagConfig;
use vigil_common::errors::Result;
use vigil_common::llm::TokenStream;
use vigil_common::metrics::QueryMetrics;
use vigil_common::{Embedder, LlmClient, VectorStore};

/// Retrieval-augmented answer pipeline
pub struct RagPipeline {
    rewriter: QueryRewriter,
    retriever: Retriever,
    assembler: ContextAssembler,
    engine: GenerationEngine,
    namespaces: Vec<String>,
    min_score: f32,
    top_k: usize,
    temperature: f32,
}

impl RagPipeline {
    /// Wire a pipeline from explicit service clients and RAG parameters.
    ///
    /// All clients are injected so tests can substitute mock services.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
        artifacts: Arc<dyn ArtifactSource>,
        config: &RagConfig,
        code_base_url: String,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(llm.clone()),
            retriever: Retriever::new(embedder, store),
            assembler: ContextAssembler::new(
                artifacts,
                code_base_url,
                &config.hydrated_namespaces,
            ),
            engine: GenerationEngine::new(llm),
            namespaces: config.namespaces.clone(),
            min_score: config.min_score,
            top_k: config.top_k,
            temperature: config.temperature,
        }
    }

    /// Shared front half of both answer modes: everything up to the
    /// generation call, producing the one GenerationRequest both use.
    async fn build_request(&self, question: &str) -> Result<GenerationRequest> {
        let refined = self.rewriter.rewrite(question).await?;

        let results = self
            .retriever
            .retrieve(&refined, &self.namespaces, self.min_score, self.top_k)
            .await?;

        let context = self.assembler.assemble(&results, &self.namespaces).await;

        tracing::debug!(
            question,
            refined = %refined,
            context_bytes = context.len(),
            "Assembled context"
        );

        Ok(GenerationRequest::new(
            context,
            question.to_string(),
            self.temperature,
        ))
    }

    /// Answer a question with one complete string
    pub async fn answer(&self, question: &str) -> Result<String> {
        let metrics = QueryMetrics::start("sync");

        let result = async {
            let request = self.build_request(question).await?;
            self.engine.generate(&request).await
        }
        .await;

        metrics.finish(result.is_ok());
        result
    }

    /// Answer a question as a lazy fragment stream.
    ///
    /// Dropping the stream early terminates the underlying call.
    pub async fn answer_stream(&self, question: &str) -> Result<TokenStream> {
        let metrics = QueryMetrics::start("stream");

        let result = async {
            let request = self.build_request(question).await?;
            self.engine.generate_stream(&request).await
        }
        .await;

        metrics.finish(result.is_ok());
        result
    }
}
