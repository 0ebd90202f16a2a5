//! Vigil RAG core
//!
//! The full answer path for one query:
//! rewrite -> retrieve (namespace fan-out) -> assemble -> generate.
//!
//! Stages are strictly sequential per query; only the per-namespace
//! retrieval calls and per-record artifact fetches run concurrently, and
//! both re-impose configured order before the next stage sees their output.

pub mod artifact;
pub mod context;
pub mod generate;
pub mod pipeline;
pub mod retrieval;
pub mod rewrite;

pub use artifact::{ArtifactFetcher, ArtifactSource};
pub use context::{ContextAssembler, FormatterKind};
pub use generate::{GenerationEngine, GenerationRequest};
pub use pipeline::RagPipeline;
pub use retrieval::{RetrievalResult, Retriever};
pub use rewrite::QueryRewriter;
