//! Vigil answer service
//!
//! Wires the configured upstream clients into a RagPipeline and streams
//! the answer for a question given on the command line. The HTTP surface
//! lives in a separate service; this binary is the pipeline itself.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info};
use vigil_common::embeddings::HttpEmbedder;
use vigil_common::llm::{GeminiClient, GeminiConfig};
use vigil_common::vectorstore::PineconeStore;
use vigil_common::{metrics, AppConfig, VERSION};
use vigil_rag::{ArtifactFetcher, RagPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Vigil v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    metrics::register_metrics();

    let question = std::env::args().nth(1).ok_or("usage: vigil <question>")?;

    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let store = Arc::new(PineconeStore::new(
        config.vector_store.index_host.clone(),
        config.vector_store.api_key.clone(),
        config.vector_store.timeout_secs,
    )?);
    let llm = Arc::new(GeminiClient::new(GeminiConfig {
        api_key: config.llm.api_key.clone().unwrap_or_default(),
        base_url: config.llm.base_url.clone(),
        model: config.llm.model.clone(),
        timeout_secs: config.llm.timeout_secs,
    })?);
    let artifacts = Arc::new(ArtifactFetcher::new(config.artifact.timeout_secs)?);

    let pipeline = RagPipeline::new(
        embedder,
        store,
        llm,
        artifacts,
        &config.rag,
        config.artifact.code_base_url.clone(),
    );

    let mut stream = pipeline.answer_stream(&question).await?;

    let mut stdout = std::io::stdout();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        stdout.write_all(fragment.as_bytes())?;
        stdout.flush()?;
    }
    stdout.write_all(b"\n")?;

    info!("Query complete");
    Ok(())
}
