//! Unified error type for the retrieval core.

use thiserror::Error;

/// Errors produced by retrieval-core operations.
///
/// The orchestrator catches these at stage boundaries and degrades the stage
/// to "no documents" rather than aborting the pipeline; they only propagate
/// out of the individual collaborator clients.
#[derive(Debug, Error)]
pub enum RagCoreError {
    /// Qdrant transport/server failure.
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Query embedding failure (LLM service).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Cross-encoder scoring failure.
    #[error("rerank error: {0}")]
    Rerank(String),

    /// Web-search collaborator failure.
    #[error("web search error: {0}")]
    WebSearch(String),

    /// HTTP transport error from reqwest-based clients.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Invalid runtime configuration (e.g. endpoint without a scheme).
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
