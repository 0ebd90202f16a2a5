//! Namespace-aware context assembly
//!
//! Renders each namespace's retrieved records to a textual block and
//! concatenates the blocks in configured namespace order. Rendering is a
//! pure function of the records and the namespace identity: the identity
//! selects the formatter through a registry rather than inline string
//! comparisons, so new formatters slot in without touching dispatch.

use crate::artifact::ArtifactSource;
use crate::retrieval::RetrievalResult;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use vigil_common::vectorstore::ScoredRecord;

/// Separator between records within a namespace block
const RECORD_SEPARATOR: &str = "\n\n---\n\n";

/// Metadata field holding a repository-relative source file path
const FILE_FIELD: &str = "file";

/// How a namespace's records are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatterKind {
    /// `key: value` lines per record
    Generic,
    /// Generic, plus fenced source hydration for `file` references
    CodeHydrating,
}

/// Assembles retrieval results into the final context string
pub struct ContextAssembler {
    registry: HashMap<String, FormatterKind>,
    artifacts: Arc<dyn ArtifactSource>,
    code_base_url: String,
}

impl ContextAssembler {
    /// Create an assembler; `hydrated_namespaces` get the code formatter
    pub fn new(
        artifacts: Arc<dyn ArtifactSource>,
        code_base_url: String,
        hydrated_namespaces: &[String],
    ) -> Self {
        let registry = hydrated_namespaces
            .iter()
            .map(|ns| (ns.clone(), FormatterKind::CodeHydrating))
            .collect();

        Self {
            registry,
            artifacts,
            code_base_url: code_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The formatter a namespace's records are rendered with
    pub fn formatter_for(&self, namespace: &str) -> FormatterKind {
        self.registry
            .get(namespace)
            .copied()
            .unwrap_or(FormatterKind::Generic)
    }

    /// Render all namespaces into one context string, in the given order.
    ///
    /// The order parameter is semantic: it determines final context
    /// ordering regardless of which retrieval call completed first.
    pub async fn assemble(&self, results: &RetrievalResult, namespaces: &[String]) -> String {
        let mut context = String::new();

        for namespace in namespaces {
            let records = results.get(namespace).map(Vec::as_slice).unwrap_or(&[]);

            context.push('\n');
            match self.formatter_for(namespace) {
                FormatterKind::Generic => context.push_str(&render_generic(records)),
                FormatterKind::CodeHydrating => {
                    context.push_str(&self.render_hydrated(records).await)
                }
            }
        }

        context
    }

    /// Render records with source hydration for `file` fields.
    ///
    /// Fetches across records run concurrently; output keeps record order.
    async fn render_hydrated(&self, records: &[ScoredRecord]) -> String {
        let rendered = join_all(records.iter().map(|record| self.render_hydrated_record(record)));
        rendered.await.join(RECORD_SEPARATOR)
    }

    async fn render_hydrated_record(&self, record: &ScoredRecord) -> String {
        let mut lines = Vec::with_capacity(record.metadata.len());

        for (key, value) in &record.metadata {
            let value = render_value(value);
            lines.push(format!("{}: {}", key, value));

            if key == FILE_FIELD {
                let url = format!("{}/{}", self.code_base_url, value);
                lines.push(self.artifacts.fetch(&url).await);
            }
        }

        lines.join("\n")
    }
}

/// Canonicalize a metadata value to text.
///
/// Strings pass through; anything else is JSON-serialized so rendering is
/// deterministic and malformed-metadata failures cannot occur.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Render records as `key: value` lines joined by the record separator
fn render_generic(records: &[ScoredRecord]) -> String {
    records
        .iter()
        .map(|record| {
            record
                .metadata
                .iter()
                .map(|(key, value)| format!("{}: {}", key, render_value(value)))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::language_for_url;
    use async_trait::async_trait;
    use serde_json::json;
    use vigil_common::vectorstore::Metadata;

    /// Artifact source with scripted availability
    struct StubArtifacts {
        available: bool,
    }

    #[async_trait]
    impl ArtifactSource for StubArtifacts {
        async fn fetch(&self, url: &str) -> String {
            if self.available {
                format!("```{}\n// exploit source\n```", language_for_url(url))
            } else {
                String::new()
            }
        }
    }

    fn record(pairs: &[(&str, serde_json::Value)]) -> ScoredRecord {
        ScoredRecord {
            id: "r".into(),
            score: 0.9,
            metadata: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Metadata>(),
        }
    }

    fn assembler(available: bool) -> ContextAssembler {
        ContextAssembler::new(
            Arc::new(StubArtifacts { available }),
            "https://gitlab.com/exploit-database/exploitdb/-/raw/main".into(),
            &["exploit_db".to_string()],
        )
    }

    #[test]
    fn test_formatter_registry() {
        let a = assembler(true);
        assert_eq!(a.formatter_for("exploit_db"), FormatterKind::CodeHydrating);
        assert_eq!(a.formatter_for("mitre_attack"), FormatterKind::Generic);
        assert_eq!(a.formatter_for("anything_else"), FormatterKind::Generic);
    }

    #[test]
    fn test_generic_rendering() {
        let records = vec![
            record(&[("name", json!("APT28")), ("type", json!("intrusion-set"))]),
            record(&[("name", json!("APT29"))]),
        ];

        let text = render_generic(&records);
        assert!(text.contains("name: APT28"));
        assert!(text.contains("type: intrusion-set"));
        assert!(text.contains("\n\n---\n\n"));
        assert!(text.contains("name: APT29"));
    }

    #[test]
    fn test_non_string_values_canonicalized() {
        let records = vec![record(&[
            ("aliases", json!(["Fancy Bear", "Sofacy"])),
            ("revoked", json!(false)),
        ])];

        let text = render_generic(&records);
        assert!(text.contains("revoked: false"));
        assert!(text.contains("Fancy Bear"));
        // Canonical serialization, not Rust debug formatting
        assert!(!text.contains("Array"));
    }

    #[tokio::test]
    async fn test_namespace_order_drives_context_order() {
        let a = ContextAssembler::new(
            Arc::new(StubArtifacts { available: true }),
            "https://example.com".into(),
            &[],
        );

        let mut results = RetrievalResult::new();
        results.insert("alpha".into(), vec![record(&[("name", json!("first"))])]);
        results.insert("beta".into(), vec![record(&[("name", json!("second"))])]);

        let forward = a
            .assemble(&results, &["alpha".into(), "beta".into()])
            .await;
        let reverse = a
            .assemble(&results, &["beta".into(), "alpha".into()])
            .await;

        assert!(forward.find("first").unwrap() < forward.find("second").unwrap());
        assert!(reverse.find("second").unwrap() < reverse.find("first").unwrap());
    }

    #[tokio::test]
    async fn test_hydrated_block_follows_file_line() {
        let a = assembler(true);

        let mut results = RetrievalResult::new();
        results.insert(
            "exploit_db".into(),
            vec![record(&[
                ("file", json!("exploits/linux/local/shellcode.c")),
                ("title", json!("Local privilege escalation")),
            ])],
        );

        let context = a.assemble(&results, &["exploit_db".into()]).await;

        let file_pos = context.find("file: exploits/linux/local/shellcode.c").unwrap();
        let fence_pos = context.find("```c\n").unwrap();
        assert!(fence_pos > file_pos);

        // Immediately after the file line, before any later field
        let between = &context[file_pos..fence_pos];
        assert!(!between.contains("title:"));
    }

    #[tokio::test]
    async fn test_failed_hydration_keeps_surrounding_lines() {
        let a = assembler(false);

        let mut results = RetrievalResult::new();
        results.insert(
            "exploit_db".into(),
            vec![record(&[
                ("file", json!("exploits/windows/remote/gone.py")),
                ("title", json!("Removed exploit")),
            ])],
        );

        let context = a.assemble(&results, &["exploit_db".into()]).await;

        assert!(context.contains("file: exploits/windows/remote/gone.py"));
        assert!(context.contains("title: Removed exploit"));
        assert!(!context.contains("```"));
    }

    #[tokio::test]
    async fn test_missing_namespace_renders_empty_block() {
        let a = assembler(true);
        let results = RetrievalResult::new();

        let context = a.assemble(&results, &["mitre_attack".into()]).await;
        assert_eq!(context, "\n");
    }
}
