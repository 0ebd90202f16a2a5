//! Code artifact fetching
//!
//! Hydrates referenced external source files into fenced code blocks.
//! Fetch failures degrade to an empty string: a missing exploit file must
//! never abort the query it was decorating.

use async_trait::async_trait;
use std::time::Duration;
use vigil_common::errors::{AppError, Result};
use vigil_common::metrics::record_artifact_fetch;

/// Source of fenced code blocks for referenced external files.
///
/// Seam for tests; production code uses [`ArtifactFetcher`].
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch a source file and render it as a fenced, language-tagged
    /// block. Returns an empty string on any failure.
    async fn fetch(&self, url: &str) -> String;
}

/// Extension -> fence language tag. Unknown extensions map to an empty tag.
const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".java", "java"),
    (".c", "c"),
    (".cpp", "cpp"),
    (".html", "html"),
    (".css", "css"),
    (".sh", "bash"),
    (".rb", "ruby"),
    (".go", "go"),
    (".rs", "rust"),
    (".php", "php"),
    (".ts", "typescript"),
    (".txt", ""),
];

/// Convert a browsable "blob" URL to its raw-content equivalent.
///
/// URLs without the blob marker are assumed to already be raw and pass
/// through unchanged, which also makes the conversion idempotent.
pub fn normalize_raw_url(url: &str) -> String {
    if url.contains("/-/blob/") {
        url.replace("/-/blob/", "/-/raw/")
    } else {
        url.to_string()
    }
}

/// Infer a syntax-highlighting language tag from a URL's file extension
pub fn language_for_url(url: &str) -> &'static str {
    // Query parameters are not part of the extension
    let path = url.split('?').next().unwrap_or(url);

    let ext = match path.rfind('.') {
        Some(pos) => &path[pos..],
        None => return "",
    };

    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
        .unwrap_or("")
}

/// Fetches external source files and wraps them as fenced code blocks
pub struct ArtifactFetcher {
    client: reqwest::Client,
}

impl ArtifactFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactSource for ArtifactFetcher {
    async fn fetch(&self, url: &str) -> String {
        let raw_url = normalize_raw_url(url);
        let language = language_for_url(&raw_url);

        let response = match self.client.get(&raw_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %raw_url, error = %e, "Artifact fetch failed");
                record_artifact_fetch(false);
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                url = %raw_url,
                status = response.status().as_u16(),
                "Artifact fetch returned non-success status"
            );
            record_artifact_fetch(false);
            return String::new();
        }

        let code = match response.text().await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(url = %raw_url, error = %e, "Artifact body read failed");
                record_artifact_fetch(false);
                return String::new();
            }
        };

        record_artifact_fetch(true);
        format!("```{}\n{}\n```", language, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_blob_to_raw() {
        let url = "https://gitlab.com/exploit-database/exploitdb/-/blob/main/exploits/linux/local/50135.c";
        assert_eq!(
            normalize_raw_url(url),
            "https://gitlab.com/exploit-database/exploitdb/-/raw/main/exploits/linux/local/50135.c"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let urls = [
            "https://gitlab.com/group/repo/-/blob/main/a.py",
            "https://gitlab.com/group/repo/-/raw/main/a.py",
            "https://example.com/no/marker/a.py",
        ];
        for url in urls {
            let once = normalize_raw_url(url);
            assert_eq!(normalize_raw_url(&once), once);
        }
    }

    #[test]
    fn test_language_inference() {
        assert_eq!(language_for_url("exploits/windows/shellcode.c"), "c");
        assert_eq!(language_for_url("tools/poc.py"), "python");
        assert_eq!(language_for_url("src/main.rs"), "rust");
        assert_eq!(language_for_url("cmd/scan.go"), "go");
        assert_eq!(language_for_url("payload.sh"), "bash");
    }

    #[test]
    fn test_language_unknown_extension_is_empty() {
        assert_eq!(language_for_url("data/sample.xyz"), "");
        assert_eq!(language_for_url("README"), "");
        assert_eq!(language_for_url("notes.txt"), "");
    }

    #[test]
    fn test_language_ignores_query_params() {
        assert_eq!(language_for_url("repo/a.py?ref_type=heads"), "python");
    }
}
