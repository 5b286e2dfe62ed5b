//! Data contracts shared across retrieval stages.

use serde::Serialize;

/// Score reported when no candidate was available at all. Distinguishable
/// from any genuine low score the reranker could produce.
pub const NO_EVIDENCE_SCORE: f32 = -10.0;

/// Placeholder score when candidates existed but reranking was skipped
/// (lexical path, or web-only mode).
pub const UNSCORED_SCORE: f32 = 0.5;

/// Origin of a candidate document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocSource {
    KnowledgeBase,
    Web,
}

impl DocSource {
    /// Prefix tag used when assembling the context string.
    pub fn tag(self) -> &'static str {
        match self {
            DocSource::KnowledgeBase => "[Docs]",
            DocSource::Web => "[Web]",
        }
    }
}

/// A document as returned by a retrieval collaborator, before reranking.
#[derive(Debug, Clone)]
pub struct CandidateDocument {
    pub content: String,
    pub source: DocSource,
    /// Coarse score from the initial retriever, when it provides one.
    pub raw_score: Option<f32>,
}

impl CandidateDocument {
    pub fn knowledge(content: impl Into<String>, raw_score: Option<f32>) -> Self {
        Self {
            content: content.into(),
            source: DocSource::KnowledgeBase,
            raw_score,
        }
    }

    pub fn web(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: DocSource::Web,
            raw_score: None,
        }
    }
}

/// A candidate paired with its cross-encoder relevance score.
///
/// Within one retrieval call these are totally ordered by `rerank_score`
/// descending; ties keep the original retrieval order (stable sort).
#[derive(Debug, Clone)]
pub struct RankedDocument {
    pub document: CandidateDocument,
    pub rerank_score: f32,
}

/// Final product of one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Tagged, truncated snippets joined with blank lines; empty only when no
    /// retrieval mode was selected or every collaborator returned nothing.
    pub context: String,
    /// Best rerank score among selected documents, [`UNSCORED_SCORE`] when
    /// scoring was skipped, or [`NO_EVIDENCE_SCORE`] when nothing was
    /// selected.
    pub top_score: f32,
    /// Candidates seen before filtering.
    pub documents_considered: usize,
    /// Documents that made it into `context`.
    pub documents_used: usize,
}

impl RetrievalResult {
    /// Result for "nothing to retrieve" and "everything came back empty".
    pub fn empty() -> Self {
        Self {
            context: String::new(),
            top_score: NO_EVIDENCE_SCORE,
            documents_considered: 0,
            documents_used: 0,
        }
    }
}

/// Truncate `text` to `max_len` characters, appending `…` when clipped.
///
/// Operates on char boundaries; a `max_len` of zero yields an empty string.
pub fn safe_content(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_uses_sentinel() {
        let r = RetrievalResult::empty();
        assert_eq!(r.context, "");
        assert_eq!(r.top_score, NO_EVIDENCE_SCORE);
        assert_eq!(r.documents_used, 0);
    }

    #[test]
    fn safe_content_truncates_on_char_boundaries() {
        assert_eq!(safe_content("short", 100), "short");
        let clipped = safe_content("pengembalian barang", 5);
        assert_eq!(clipped.chars().count(), 5);
        assert!(clipped.ends_with('…'));
        // Multi-byte input must not panic.
        let uni = safe_content("kualitas—barang—rusak", 8);
        assert_eq!(uni.chars().count(), 8);
        assert_eq!(safe_content("abc", 0), "");
    }

    #[test]
    fn source_tags() {
        assert_eq!(DocSource::KnowledgeBase.tag(), "[Docs]");
        assert_eq!(DocSource::Web.tag(), "[Web]");
    }
}
