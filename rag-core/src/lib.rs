//! Retrieval core: knowledge-base search, reranking, threshold filtering with
//! adaptive fallback, and the quality gate.
//!
//! The pipeline hands a (possibly reformulated) query and a retrieval mode to
//! [`retrieve::retrieve_context`], which returns a bounded context string plus
//! the top evidence score. [`quality_gate::gate`] then maps that score into a
//! good/medium/poor verdict; what to do with the verdict is the caller's
//! policy.

pub mod config;
pub mod documents;
pub mod knowledge;
pub mod lexical;
pub mod quality_gate;
pub mod reranker;
pub mod retrieve;
pub mod web_search;

pub mod errors {
    pub mod rag_core_error;
}

pub use config::RagConfig;
pub use documents::{
    CandidateDocument, DocSource, RankedDocument, RetrievalResult, NO_EVIDENCE_SCORE,
    UNSCORED_SCORE,
};
pub use errors::rag_core_error::RagCoreError;
pub use knowledge::{KnowledgeRetriever, QdrantRetriever};
pub use quality_gate::{gate, QualityTier, QualityVerdict};
pub use reranker::{CrossEncoderClient, Reranker};
pub use retrieve::{retrieve_context, RetrievalDeps, RetrievalMode};
pub use web_search::{SearxClient, WebSearch};
