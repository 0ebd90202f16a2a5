//! Query rewriting
//!
//! Turns a free-form question into a keyword-dense query suited to
//! nearest-neighbor search. A failed rewrite aborts the whole query rather
//! than falling back to the raw question: retrieval over conversational
//! framing silently degrades answer quality, and the same credential is
//! about to be used for generation anyway.

use std::sync::Arc;
use vigil_common::errors::Result;
use vigil_common::llm::LlmClient;

/// Instruction sent alongside the raw question
const REWRITE_INSTRUCTION: &str = "Convert the following question to a text query for a vector \
     searcher. Keep only its keywords and avoid unnecessary words. Rephrase the whole question \
     into a very refined query; never write that information is needed.";

/// Rewrites questions into retrieval queries via the LLM
pub struct QueryRewriter {
    llm: Arc<dyn LlmClient>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Rewrite a raw question into a refined retrieval query
    pub async fn rewrite(&self, raw_query: &str) -> Result<String> {
        let prompt = format!("{}\n'{}'", REWRITE_INSTRUCTION, raw_query);
        let refined = self.llm.complete(&prompt, "", 0.0).await?;

        tracing::debug!(raw = raw_query, refined = %refined, "Rewrote query");
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::llm::MockLlm;

    #[tokio::test]
    async fn test_rewrite_non_empty() {
        let llm = Arc::new(MockLlm::new(&["APT28 attribution Russian government"]));
        let rewriter = QueryRewriter::new(llm);

        let refined = rewriter
            .rewrite("Can you tell me who APT28 has been attributed to?")
            .await
            .unwrap();

        assert!(!refined.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_sends_raw_query() {
        let llm = Arc::new(MockLlm::new(&["keywords"]));
        let rewriter = QueryRewriter::new(llm.clone());

        rewriter.rewrite("what is a buffer overflow?").await.unwrap();

        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("what is a buffer overflow?"));
        assert!(calls[0].prompt.contains("keywords"));
    }
}
