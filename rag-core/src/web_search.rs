//! Web search collaborator (SearxNG-compatible JSON API).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::documents::CandidateDocument;
use crate::errors::rag_core_error::RagCoreError;

/// Fetches fresh web snippets for a query.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>, RagCoreError>;
}

/// Client for a SearxNG instance's `/search?format=json` endpoint.
#[derive(Debug, Clone)]
pub struct SearxClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Deserialize)]
struct SearxResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

impl SearxClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RagCoreError> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(RagCoreError::InvalidConfig(format!(
                "web search endpoint must be http(s): {endpoint}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl WebSearch for SearxClient {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<CandidateDocument>, RagCoreError> {
        let url = format!("{}/search", self.endpoint.trim_end_matches('/'));
        let resp = self
            .http
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RagCoreError::WebSearch(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        let body: SearxResponse = resp
            .json()
            .await
            .map_err(|e| RagCoreError::WebSearch(format!("decode: {e}")))?;

        let out: Vec<CandidateDocument> = body
            .results
            .into_iter()
            .filter(|r| !r.content.is_empty())
            .take(k)
            .map(|r| {
                let snippet = if r.title.is_empty() {
                    format!("{} ({})", r.content, r.url)
                } else {
                    format!("{}: {} ({})", r.title, r.content, r.url)
                };
                CandidateDocument::web(snippet)
            })
            .collect();
        debug!(target: "rag_core::web_search", hits = out.len(), k, "web search done");
        Ok(out)
    }
}
