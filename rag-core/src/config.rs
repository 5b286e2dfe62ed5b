//! Retrieval configuration read from environment variables.
//!
//! Every knob has a hard-coded safe default so a missing or malformed value
//! never prevents the pipeline from operating; thresholds are calibrated to
//! the configured reranker model and carry no fixed-range guarantee.

use serde::Serialize;

/// Knowledge-base retrieval and reranking knobs.
#[derive(Debug, Clone, Serialize)]
pub struct RagConfig {
    /// Candidates fetched from the knowledge base per query.
    pub retrieval_k: usize,
    /// Documents kept after reranking.
    pub reranker_top_k: usize,
    /// Primary rerank-score threshold for keeping a candidate.
    pub relevance_threshold: f32,
    /// Whether the cross-encoder reranker is applied at all.
    pub use_reranker: bool,
    /// Relax the threshold when nothing clears it (see `retrieve`).
    pub enable_adaptive_fallback: bool,
    /// Fallback band: top-2 documents when `top_score` is at least this,
    /// top-1 below it.
    pub fallback_threshold_high: f32,
    /// Quality gate: scores at or above this are `good`.
    pub threshold_good: f32,
    /// Quality gate: scores at or above this (but below good) are `medium`.
    pub threshold_medium: f32,
    /// Web snippets fetched per query in web/all modes.
    pub k_web: usize,
    /// Per-document character cap when assembling context.
    pub max_snippet_chars: usize,
    /// Word-overlap ratio threshold for the lexical filter (reranker off).
    pub lexical_overlap_threshold: f32,

    /// Qdrant gRPC URL.
    pub qdrant_url: String,
    /// Qdrant collection holding knowledge-base chunks.
    pub qdrant_collection: String,
    /// Embedding dimensionality for the query vector sanity check.
    pub embedding_dim: usize,

    /// Cross-encoder reranker HTTP endpoint (TEI-style `/rerank`).
    pub reranker_endpoint: String,
    /// SearxNG-compatible web search endpoint.
    pub web_search_endpoint: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 7,
            reranker_top_k: 3,
            relevance_threshold: 1.0,
            use_reranker: true,
            enable_adaptive_fallback: true,
            fallback_threshold_high: 0.3,
            threshold_good: 0.5,
            threshold_medium: 0.0,
            k_web: 3,
            max_snippet_chars: 2000,
            lexical_overlap_threshold: 0.8,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_collection: "kb_chunks".to_string(),
            embedding_dim: 1024,
            reranker_endpoint: "http://localhost:8081".to_string(),
            web_search_endpoint: "http://localhost:8888".to_string(),
        }
    }
}

impl RagConfig {
    /// Build from environment variables with defaults for anything missing.
    ///
    /// Never fails: unparseable values fall back to the default so the
    /// pipeline stays operable with a misconfigured environment.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            retrieval_k: parse("RAG_RETRIEVAL_K", d.retrieval_k),
            reranker_top_k: parse("RAG_RERANKER_TOP_K", d.reranker_top_k),
            relevance_threshold: parse("RAG_RELEVANCE_THRESHOLD", d.relevance_threshold),
            use_reranker: env("RAG_USE_RERANKER", "true") == "true",
            enable_adaptive_fallback: env("RAG_ADAPTIVE_FALLBACK", "true") == "true",
            fallback_threshold_high: parse("RAG_FALLBACK_THRESHOLD_HIGH", d.fallback_threshold_high),
            threshold_good: parse("QUALITY_GATE_THRESHOLD_GOOD", d.threshold_good),
            threshold_medium: parse("QUALITY_GATE_THRESHOLD_MEDIUM", d.threshold_medium),
            k_web: parse("RAG_K_WEB", d.k_web),
            max_snippet_chars: parse("RAG_MAX_SNIPPET_CHARS", d.max_snippet_chars),
            lexical_overlap_threshold: parse(
                "RAG_LEXICAL_OVERLAP_THRESHOLD",
                d.lexical_overlap_threshold,
            ),
            qdrant_url: env("QDRANT_URL", &d.qdrant_url),
            qdrant_collection: env("QDRANT_COLLECTION", &d.qdrant_collection),
            embedding_dim: parse("EMBEDDING_DIM", d.embedding_dim),
            reranker_endpoint: env("RERANKER_URL", &d.reranker_endpoint),
            web_search_endpoint: env("WEB_SEARCH_URL", &d.web_search_endpoint),
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(dflt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RagConfig::default();
        assert!(cfg.threshold_good > cfg.threshold_medium);
        assert!(cfg.fallback_threshold_high > cfg.threshold_medium);
        assert!(cfg.reranker_top_k <= cfg.retrieval_k);
    }
}
