//! Generative language service abstraction
//!
//! Exposes one synchronous completion call and one incremental-streaming
//! call. A [`TokenStream`] is finite, forward-only, and not restartable:
//! consuming it twice requires issuing a new request, and dropping it drops
//! the underlying connection.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;

/// Lazy sequence of answer fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for generative language services
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One blocking call returning the full completion text
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String>;

    /// Open a streaming call yielding fragments as they arrive
    async fn complete_stream(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<TokenStream>;
}

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Gemini client via the Generative Language API v1beta (text-only)
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, method: &str, sse: bool) -> String {
        format!(
            "{}/v1beta/models/{}:{}?{}key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method,
            if sse { "alt=sse&" } else { "" },
            self.config.api_key
        )
    }

    fn body(prompt: &str, system_instruction: &str, temperature: f32) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}],
            }],
            "systemInstruction": {"parts": [{"text": system_instruction}]},
            "generationConfig": {"temperature": temperature},
        })
    }

    fn extract_text(response: GeminiResponse) -> String {
        response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String> {
        let url = self.endpoint("generateContent", false);
        let body = Self::body(prompt, system_instruction, temperature);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GenerationError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: GeminiResponse =
            response.json().await.map_err(|e| AppError::GenerationError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(Self::extract_text(parsed))
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<TokenStream> {
        let url = self.endpoint("streamGenerateContent", true);
        let body = Self::body(prompt, system_instruction, temperature);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GenerationError {
                message: format!("Stream request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| AppError::GenerationError {
                    message: format!("Stream read failed: {}", e),
                })?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited `data: {json}` lines
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload.is_empty() || payload == "[DONE]" {
                        continue;
                    }

                    let parsed: GeminiResponse = serde_json::from_str(payload)
                        .map_err(|e| AppError::GenerationError {
                            message: format!("Failed to parse stream chunk: {}", e),
                        })?;

                    let text = Self::extract_text(parsed);
                    if !text.is_empty() {
                        yield text;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Mock LLM for testing: scripted fragments, recorded calls
#[derive(Default)]
pub struct MockLlm {
    fragments: Vec<String>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

/// One recorded `complete`/`complete_stream` invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl MockLlm {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn record(&self, prompt: &str, system_instruction: &str, temperature: f32) {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.to_string(),
            temperature,
        });
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String> {
        self.record(prompt, system_instruction, temperature);
        Ok(self.fragments.concat())
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<TokenStream> {
        self.record(prompt, system_instruction, temperature);
        let fragments = self.fragments.clone();
        Ok(Box::pin(futures::stream::iter(
            fragments.into_iter().map(Ok::<_, AppError>),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_mock_stream_concat_equals_complete() {
        let llm = MockLlm::new(&["APT28 is ", "a threat ", "group."]);

        let sync = llm.complete("q", "sys", 0.8).await.unwrap();
        let stream = llm.complete_stream("q", "sys", 0.8).await.unwrap();
        let fragments: Vec<String> = stream.try_collect().await.unwrap();

        assert_eq!(fragments.concat(), sync);
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let llm = MockLlm::new(&["ok"]);
        llm.complete("prompt text", "persona", 0.3).await.unwrap();

        let calls = llm.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "prompt text");
        assert_eq!(calls[0].system_instruction, "persona");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response = GeminiResponse { candidates: vec![] };
        assert_eq!(GeminiClient::extract_text(response), "");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(GeminiClient::extract_text(parsed), "Hello world");
    }
}
