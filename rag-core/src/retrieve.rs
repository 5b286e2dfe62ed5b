//! Retrieval orchestration: knowledge search, reranking, threshold filtering
//! with adaptive fallback, and context assembly.
//!
//! Each stage degrades independently. A failed knowledge search, reranker, or
//! web search downgrades that stage to "no documents" and the call still
//! returns a usable [`RetrievalResult`]; errors never cross the orchestrator
//! boundary.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::documents::{
    CandidateDocument, RankedDocument, RetrievalResult, NO_EVIDENCE_SCORE, UNSCORED_SCORE,
    safe_content,
};
use crate::knowledge::KnowledgeRetriever;
use crate::lexical::filter_by_overlap;
use crate::reranker::{Reranker, rerank_with_scores};
use crate::web_search::WebSearch;

/// Which collaborators to consult for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Knowledge base only.
    Docs,
    /// Web search only.
    Web,
    /// Knowledge base plus web.
    All,
}

impl RetrievalMode {
    fn wants_docs(self) -> bool {
        matches!(self, RetrievalMode::Docs | RetrievalMode::All)
    }

    fn wants_web(self) -> bool {
        matches!(self, RetrievalMode::Web | RetrievalMode::All)
    }
}

/// Collaborators the orchestrator drives. Trait objects so tests can swap in
/// stubs without network services.
#[derive(Clone)]
pub struct RetrievalDeps {
    pub knowledge: Arc<dyn KnowledgeRetriever>,
    pub web: Arc<dyn WebSearch>,
    pub reranker: Arc<dyn Reranker>,
}

/// Retrieve and assemble context for `query` according to `mode`.
///
/// The returned `top_score` reflects knowledge-base evidence quality:
/// the best rerank score when the cross-encoder ran, [`UNSCORED_SCORE`] when
/// documents were selected without scoring (lexical path, web-only mode),
/// and [`NO_EVIDENCE_SCORE`] when nothing was selected.
pub async fn retrieve_context(
    query: &str,
    mode: RetrievalMode,
    deps: &RetrievalDeps,
    cfg: &RagConfig,
) -> RetrievalResult {
    let mut considered = 0usize;
    let mut selected: Vec<RankedDocument> = Vec::new();
    let mut top_score: Option<f32> = None;

    if mode.wants_docs() {
        let candidates = match deps.knowledge.retrieve(query, cfg.retrieval_k).await {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "rag_core::retrieve", error = %e, "knowledge search failed, continuing without docs");
                Vec::new()
            }
        };
        considered += candidates.len();

        if !candidates.is_empty() {
            let (docs, score) = select_documents(query, candidates, deps, cfg).await;
            // Nothing selected means no usable evidence, even when scores
            // were observed: the quality gate must see the sentinel.
            if !docs.is_empty() {
                top_score = Some(score);
                selected = docs;
            }
        }
    }

    let mut web_docs: Vec<CandidateDocument> = Vec::new();
    if mode.wants_web() {
        match deps.web.search(query, cfg.k_web).await {
            Ok(hits) => {
                considered += hits.len();
                web_docs = hits;
            }
            Err(e) => {
                warn!(target: "rag_core::retrieve", error = %e, "web search failed, continuing without web results");
            }
        }
    }

    // Web snippets are unscored; they lend freshness, not evidence quality.
    if top_score.is_none() && !web_docs.is_empty() {
        top_score = Some(UNSCORED_SCORE);
    }

    let mut pieces: Vec<String> = Vec::with_capacity(selected.len() + web_docs.len());
    for ranked in &selected {
        pieces.push(format_snippet(&ranked.document, cfg.max_snippet_chars));
    }
    for doc in &web_docs {
        pieces.push(format_snippet(doc, cfg.max_snippet_chars));
    }

    let used = pieces.len();
    let result = RetrievalResult {
        context: pieces.join("\n\n"),
        top_score: top_score.unwrap_or(NO_EVIDENCE_SCORE),
        documents_considered: considered,
        documents_used: used,
    };
    debug!(
        target: "rag_core::retrieve",
        ?mode,
        considered = result.documents_considered,
        used = result.documents_used,
        top_score = result.top_score,
        "retrieval done"
    );
    result
}

/// Rank knowledge candidates and apply the threshold / adaptive-fallback
/// selection. Returns the chosen documents best-first and the top score.
async fn select_documents(
    query: &str,
    candidates: Vec<CandidateDocument>,
    deps: &RetrievalDeps,
    cfg: &RagConfig,
) -> (Vec<RankedDocument>, f32) {
    if cfg.use_reranker {
        match deps.reranker.score(query, &candidates).await {
            Ok(scores) if scores.len() == candidates.len() => {
                let ranked = rerank_with_scores(candidates, &scores);
                return apply_threshold(ranked, cfg);
            }
            Ok(scores) => {
                warn!(
                    target: "rag_core::retrieve",
                    got = scores.len(),
                    "reranker returned wrong score count, falling back to lexical"
                );
            }
            Err(e) => {
                warn!(target: "rag_core::retrieve", error = %e, "reranker failed, falling back to lexical");
            }
        }
    }
    (lexical_select(query, candidates, cfg), UNSCORED_SCORE)
}

/// Threshold filter with adaptive fallback.
///
/// Documents at or above `relevance_threshold` are kept (capped at
/// `reranker_top_k`). When none clear it and the fallback is enabled, the
/// band the top score lands in decides how many of the best documents to keep
/// anyway: top-2 in the high band, top-1 below that. With the fallback off,
/// nothing below the threshold is ever used.
fn apply_threshold(ranked: Vec<RankedDocument>, cfg: &RagConfig) -> (Vec<RankedDocument>, f32) {
    let top = ranked
        .first()
        .map(|r| r.rerank_score)
        .unwrap_or(NO_EVIDENCE_SCORE);

    let passing: Vec<RankedDocument> = ranked
        .iter()
        .filter(|r| r.rerank_score >= cfg.relevance_threshold)
        .take(cfg.reranker_top_k)
        .cloned()
        .collect();
    if !passing.is_empty() {
        return (passing, top);
    }
    if !cfg.enable_adaptive_fallback || ranked.is_empty() {
        return (Vec::new(), top);
    }

    let keep = if top >= cfg.fallback_threshold_high {
        2
    } else {
        1
    };
    let kept: Vec<RankedDocument> = ranked.into_iter().take(keep.min(cfg.reranker_top_k)).collect();
    debug!(
        target: "rag_core::retrieve",
        top_score = top,
        kept = kept.len(),
        "no document cleared the threshold, adaptive fallback applied"
    );
    (kept, top)
}

/// Reranker-off selection: lexical overlap filter, original order, unscored.
fn lexical_select(
    query: &str,
    candidates: Vec<CandidateDocument>,
    cfg: &RagConfig,
) -> Vec<RankedDocument> {
    let texts: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
    let kept = filter_by_overlap(query, &texts, cfg.lexical_overlap_threshold);
    let mut by_index: Vec<Option<CandidateDocument>> = candidates.into_iter().map(Some).collect();
    kept.into_iter()
        .take(cfg.reranker_top_k)
        .filter_map(|i| by_index.get_mut(i).and_then(Option::take))
        .map(|document| RankedDocument {
            document,
            rerank_score: UNSCORED_SCORE,
        })
        .collect()
}

fn format_snippet(doc: &CandidateDocument, max_chars: usize) -> String {
    format!("{} {}", doc.source.tag(), safe_content(&doc.content, max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::rag_core_error::RagCoreError;
    use async_trait::async_trait;

    struct StubKnowledge(Result<Vec<String>, ()>);

    #[async_trait]
    impl KnowledgeRetriever for StubKnowledge {
        async fn retrieve(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<CandidateDocument>, RagCoreError> {
            match &self.0 {
                Ok(texts) => Ok(texts
                    .iter()
                    .map(|t| CandidateDocument::knowledge(t.clone(), Some(0.5)))
                    .collect()),
                Err(()) => Err(RagCoreError::Qdrant("down".into())),
            }
        }
    }

    struct StubWeb(Vec<String>);

    #[async_trait]
    impl WebSearch for StubWeb {
        async fn search(
            &self,
            _query: &str,
            k: usize,
        ) -> Result<Vec<CandidateDocument>, RagCoreError> {
            Ok(self
                .0
                .iter()
                .take(k)
                .map(|t| CandidateDocument::web(t.clone()))
                .collect())
        }
    }

    struct StubReranker(Vec<f32>);

    #[async_trait]
    impl Reranker for StubReranker {
        async fn score(
            &self,
            _query: &str,
            candidates: &[CandidateDocument],
        ) -> Result<Vec<f32>, RagCoreError> {
            if self.0.len() == candidates.len() {
                Ok(self.0.clone())
            } else {
                Err(RagCoreError::Rerank("unavailable".into()))
            }
        }
    }

    fn deps(
        knowledge: StubKnowledge,
        web: StubWeb,
        reranker: StubReranker,
    ) -> RetrievalDeps {
        RetrievalDeps {
            knowledge: Arc::new(knowledge),
            web: Arc::new(web),
            reranker: Arc::new(reranker),
        }
    }

    fn cfg() -> RagConfig {
        RagConfig {
            relevance_threshold: 1.0,
            ..RagConfig::default()
        }
    }

    #[tokio::test]
    async fn docs_mode_passing_threshold() {
        let d = deps(
            StubKnowledge(Ok(vec!["retur A".into(), "retur B".into(), "promo".into()])),
            StubWeb(vec![]),
            StubReranker(vec![1.4, 0.1, 1.1]),
        );
        let r = retrieve_context("retur", RetrievalMode::Docs, &d, &cfg()).await;
        assert_eq!(r.documents_used, 2);
        assert_eq!(r.top_score, 1.4);
        assert!(r.context.starts_with("[Docs] retur A"));
        assert!(r.context.contains("\n\n[Docs] promo"));
        assert!(!r.context.contains("retur B"));
    }

    #[tokio::test]
    async fn adaptive_fallback_bands() {
        // High band keeps top-2.
        let d = deps(
            StubKnowledge(Ok(vec!["a".into(), "b".into(), "c".into()])),
            StubWeb(vec![]),
            StubReranker(vec![0.35, 0.30, 0.05]),
        );
        let r = retrieve_context("q", RetrievalMode::Docs, &d, &cfg()).await;
        assert_eq!(r.documents_used, 2);
        assert_eq!(r.top_score, 0.35);

        // Below the high band keeps top-1, even deep in the negatives.
        let d = deps(
            StubKnowledge(Ok(vec!["a".into(), "b".into()])),
            StubWeb(vec![]),
            StubReranker(vec![-2.0, -3.0]),
        );
        let r = retrieve_context("q", RetrievalMode::Docs, &d, &cfg()).await;
        assert_eq!(r.documents_used, 1);
        assert_eq!(r.top_score, -2.0);
    }

    #[tokio::test]
    async fn fallback_disabled_uses_nothing() {
        let mut c = cfg();
        c.enable_adaptive_fallback = false;
        let d = deps(
            StubKnowledge(Ok(vec!["a".into()])),
            StubWeb(vec![]),
            StubReranker(vec![0.4]),
        );
        let r = retrieve_context("q", RetrievalMode::Docs, &d, &c).await;
        assert_eq!(r.documents_used, 0);
        assert_eq!(r.context, "");
        assert_eq!(r.top_score, NO_EVIDENCE_SCORE);
    }

    #[tokio::test]
    async fn web_only_is_unscored() {
        let d = deps(
            StubKnowledge(Ok(vec![])),
            StubWeb(vec!["berita terbaru".into()]),
            StubReranker(vec![]),
        );
        let r = retrieve_context("q", RetrievalMode::Web, &d, &cfg()).await;
        assert_eq!(r.top_score, UNSCORED_SCORE);
        assert!(r.context.starts_with("[Web] "));
    }

    #[tokio::test]
    async fn all_mode_appends_web_after_docs() {
        let d = deps(
            StubKnowledge(Ok(vec!["kb".into()])),
            StubWeb(vec!["web".into()]),
            StubReranker(vec![1.5]),
        );
        let r = retrieve_context("q", RetrievalMode::All, &d, &cfg()).await;
        assert_eq!(r.context, "[Docs] kb\n\n[Web] web");
        assert_eq!(r.top_score, 1.5);
        assert_eq!(r.documents_considered, 2);
    }

    #[tokio::test]
    async fn knowledge_failure_degrades_to_empty() {
        let d = deps(
            StubKnowledge(Err(())),
            StubWeb(vec![]),
            StubReranker(vec![]),
        );
        let r = retrieve_context("q", RetrievalMode::Docs, &d, &cfg()).await;
        assert_eq!(r.top_score, NO_EVIDENCE_SCORE);
        assert_eq!(r.documents_used, 0);
    }

    #[tokio::test]
    async fn reranker_failure_falls_back_to_lexical() {
        let d = deps(
            StubKnowledge(Ok(vec!["cara retur barang".into(), "promo".into()])),
            StubWeb(vec![]),
            // Wrong score count forces the error path in the stub.
            StubReranker(vec![0.1]),
        );
        let r = retrieve_context("retur barang", RetrievalMode::Docs, &d, &cfg()).await;
        assert_eq!(r.top_score, UNSCORED_SCORE);
        assert_eq!(r.documents_used, 1);
        assert!(r.context.contains("cara retur barang"));
    }

    #[tokio::test]
    async fn reranker_disabled_uses_lexical_path() {
        let mut c = cfg();
        c.use_reranker = false;
        let d = deps(
            StubKnowledge(Ok(vec!["cara retur barang".into(), "promo".into()])),
            StubWeb(vec![]),
            // Would pass the threshold if it were consulted.
            StubReranker(vec![2.0, 2.0]),
        );
        let r = retrieve_context("retur barang", RetrievalMode::Docs, &d, &c).await;
        assert_eq!(r.top_score, UNSCORED_SCORE);
        assert_eq!(r.documents_used, 1);
        assert!(r.context.contains("cara retur barang"));
        assert!(!r.context.contains("promo"));
    }

    #[tokio::test]
    async fn snippets_are_truncated() {
        let mut c = cfg();
        c.max_snippet_chars = 10;
        let d = deps(
            StubKnowledge(Ok(vec!["x".repeat(50)])),
            StubWeb(vec![]),
            StubReranker(vec![1.5]),
        );
        let r = retrieve_context("q", RetrievalMode::Docs, &d, &c).await;
        // "[Docs] " prefix plus the clipped body.
        assert!(r.context.chars().count() <= 7 + 10);
        assert!(r.context.ends_with('…'));
    }
}
