//! Cross-encoder reranking.
//!
//! The trait keeps the orchestrator testable without a running scorer; the
//! HTTP client targets a TEI-compatible `/rerank` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::{CandidateDocument, RankedDocument};
use crate::errors::rag_core_error::RagCoreError;

/// Scores query/document pairs with a cross-encoder model.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per candidate, same order as the input slice.
    async fn score(
        &self,
        query: &str,
        candidates: &[CandidateDocument],
    ) -> Result<Vec<f32>, RagCoreError>;
}

/// Pair candidates with their scores and sort best-first.
///
/// Stable descending sort: ties keep the original retrieval order. Scores
/// that are NaN sink to the end.
pub fn rerank_with_scores(
    candidates: Vec<CandidateDocument>,
    scores: &[f32],
) -> Vec<RankedDocument> {
    let mut ranked: Vec<RankedDocument> = candidates
        .into_iter()
        .zip(scores.iter().copied())
        .map(|(document, rerank_score)| RankedDocument {
            document,
            rerank_score,
        })
        .collect();
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    ranked.sort_by(|a, b| key(b.rerank_score).total_cmp(&key(a.rerank_score)));
    ranked
}

/// HTTP client for a TEI-style rerank service.
#[derive(Debug, Clone)]
pub struct CrossEncoderClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

impl CrossEncoderClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RagCoreError> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(RagCoreError::InvalidConfig(format!(
                "reranker endpoint must be http(s): {endpoint}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl Reranker for CrossEncoderClient {
    async fn score(
        &self,
        query: &str,
        candidates: &[CandidateDocument],
    ) -> Result<Vec<f32>, RagCoreError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/rerank", self.endpoint.trim_end_matches('/'));
        let body = RerankRequest {
            query,
            texts: candidates.iter().map(|c| c.content.as_str()).collect(),
        };
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(RagCoreError::Rerank(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        let entries: Vec<RerankEntry> = resp
            .json()
            .await
            .map_err(|e| RagCoreError::Rerank(format!("decode: {e}")))?;

        // The service may reorder entries; map back by index.
        let mut scores = vec![f32::NEG_INFINITY; candidates.len()];
        for entry in entries {
            if let Some(slot) = scores.get_mut(entry.index) {
                *slot = entry.score;
            }
        }
        debug!(target: "rag_core::reranker", candidates = candidates.len(), "scored");
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> CandidateDocument {
        CandidateDocument::knowledge(text, None)
    }

    #[test]
    fn sorts_descending_keeping_ties_stable() {
        let ranked = rerank_with_scores(
            vec![doc("a"), doc("b"), doc("c"), doc("d")],
            &[0.1, 0.9, 0.1, 0.5],
        );
        let order: Vec<&str> = ranked
            .iter()
            .map(|r| r.document.content.as_str())
            .collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn nan_scores_sink() {
        let ranked = rerank_with_scores(vec![doc("a"), doc("b")], &[f32::NAN, 0.2]);
        assert_eq!(ranked[0].document.content, "b");
    }

    #[test]
    fn rejects_schemeless_endpoint() {
        assert!(CrossEncoderClient::new("localhost:8081", 10).is_err());
    }
}
