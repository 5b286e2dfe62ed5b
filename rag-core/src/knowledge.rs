//! Knowledge-base retrieval over Qdrant.

use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::SearchPointsBuilder;
use tracing::{debug, warn};

use llm_service::LlmServiceProfiles;

use crate::config::RagConfig;
use crate::documents::CandidateDocument;
use crate::errors::rag_core_error::RagCoreError;

/// Fetches knowledge-base candidates for a query.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>, RagCoreError>;
}

/// Embeds the query via the LLM service and runs KNN search against the
/// configured Qdrant collection. Prefer the gRPC port (6334) for the client.
pub struct QdrantRetriever {
    client: Qdrant,
    collection: String,
    embedding_dim: usize,
    llm: Arc<LlmServiceProfiles>,
}

impl QdrantRetriever {
    pub fn new(cfg: &RagConfig, llm: Arc<LlmServiceProfiles>) -> Result<Self, RagCoreError> {
        let client = Qdrant::from_url(&cfg.qdrant_url)
            .build()
            .map_err(|e| RagCoreError::Qdrant(e.to_string()))?;
        Ok(Self {
            client,
            collection: cfg.qdrant_collection.clone(),
            embedding_dim: cfg.embedding_dim,
            llm,
        })
    }
}

#[async_trait]
impl KnowledgeRetriever for QdrantRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>, RagCoreError> {
        let vector = self
            .llm
            .embed(query)
            .await
            .map_err(|e| RagCoreError::Embedding(e.to_string()))?;
        if self.embedding_dim != 0 && vector.len() != self.embedding_dim {
            warn!(
                target: "rag_core::knowledge",
                got = vector.len(),
                expected = self.embedding_dim,
                "embedding dimensionality mismatch"
            );
        }

        let builder = SearchPointsBuilder::new(&self.collection, vector, k as u64)
            .with_payload(true)
            .with_vectors(false);
        let resp = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagCoreError::Qdrant(e.to_string()))?;

        let mut out = Vec::with_capacity(resp.result.len());
        for point in resp.result {
            let content = point
                .payload
                .get("content")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_default();
            if content.is_empty() {
                continue;
            }
            out.push(CandidateDocument::knowledge(content, Some(point.score)));
        }
        debug!(target: "rag_core::knowledge", hits = out.len(), k, "knowledge search done");
        Ok(out)
    }
}
