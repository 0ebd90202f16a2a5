//! Answer generation
//!
//! Builds the final prompt from the assembled context and the original
//! question, then invokes the generative service either for one complete
//! answer or for an incremental fragment stream. Both paths share one
//! request construction so their prompts are byte-identical.

use std::sync::Arc;
use std::time::Instant;
use vigil_common::errors::Result;
use vigil_common::llm::{LlmClient, TokenStream};
use vigil_common::metrics::record_generation;

/// Fixed assistant persona. The domain restriction lives here, not in
/// post-processing.
pub const SYSTEM_INSTRUCTION: &str = "You are a cybersecurity expert AI assistant. Directly answer \
     the query without mentioning anything about yourself. Do not answer any question outside \
     your domain.";

/// Everything needed for one generation call, constructed once per query
/// and reused identically by the sync and streaming paths.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub context: String,
    pub question: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(context: String, question: String, temperature: f32) -> Self {
        Self {
            context,
            question,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            temperature,
        }
    }

    /// Render the single prompt both generation modes send
    pub fn prompt(&self) -> String {
        format!(
            "Following is the context:\n---\n{}\n\nNow answer the following user query by \
             giving a DETAILED DESCRIPTION:\n\"{}\"",
            self.context, self.question
        )
    }
}

/// Drives the generative service
pub struct GenerationEngine {
    llm: Arc<dyn LlmClient>,
}

impl GenerationEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// One blocking call returning the full answer
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let start = Instant::now();
        let result = self
            .llm
            .complete(
                &request.prompt(),
                &request.system_instruction,
                request.temperature,
            )
            .await;

        record_generation(start.elapsed().as_secs_f64(), "sync", result.is_ok());
        result
    }

    /// Open a streaming call yielding answer fragments.
    ///
    /// The stream is finite, forward-only, and not restartable; consuming
    /// it twice requires a new request.
    pub async fn generate_stream(&self, request: &GenerationRequest) -> Result<TokenStream> {
        let start = Instant::now();
        let result = self
            .llm
            .complete_stream(
                &request.prompt(),
                &request.system_instruction,
                request.temperature,
            )
            .await;

        record_generation(start.elapsed().as_secs_f64(), "stream", result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use vigil_common::llm::MockLlm;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "\nname: APT28\ntype: intrusion-set".into(),
            "Who is APT28 attributed to?".into(),
            0.8,
        )
    }

    #[test]
    fn test_prompt_embeds_context_and_question() {
        let prompt = request().prompt();
        assert!(prompt.contains("name: APT28"));
        assert!(prompt.contains("\"Who is APT28 attributed to?\""));
    }

    #[tokio::test]
    async fn test_both_modes_build_identical_prompts() {
        let llm = Arc::new(MockLlm::new(&["answer"]));
        let engine = GenerationEngine::new(llm.clone());
        let request = request();

        engine.generate(&request).await.unwrap();
        let _ = engine.generate_stream(&request).await.unwrap();

        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].prompt, calls[1].prompt);
        assert_eq!(calls[0].system_instruction, calls[1].system_instruction);
        assert_eq!(calls[0].temperature, calls[1].temperature);
    }

    #[tokio::test]
    async fn test_stream_concat_equals_sync_answer() {
        let llm = Arc::new(MockLlm::new(&["APT28 is attributed ", "to the GRU."]));
        let engine = GenerationEngine::new(llm);
        let request = request();

        let sync = engine.generate(&request).await.unwrap();
        let stream = engine.generate_stream(&request).await.unwrap();
        let fragments: Vec<String> = stream.try_collect().await.unwrap();

        assert_eq!(fragments.concat(), sync);
    }
}
