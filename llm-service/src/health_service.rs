//! Universal health service for LLM backends (Ollama, OpenAI).
//!
//! Lightweight reachability probes:
//! - Ollama: `GET {endpoint}/api/tags`
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a
//! `/health` endpoint. [`HealthService::check`] is resilient and never fails
//! (errors mapped to `ok=false`).

use std::time::{Duration, Instant};

use reqwest::header;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::Result;

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Ollama", "OpenAi").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier relevant to the probe.
    pub model: String,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the probe.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

/// Reachability checker shared by all profiles.
pub struct HealthService {
    client: reqwest::Client,
}

impl HealthService {
    /// Builds the checker with an optional probe timeout (default 10s).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(10)))
            .build()?;
        Ok(Self { client })
    }

    /// Probes every config in `list`; never fails, failures become
    /// `ok = false` entries.
    pub async fn check_many(&self, list: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(list.len());
        for cfg in list {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// Probes a single config.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let base = cfg.endpoint.trim_end_matches('/');
        let url = match cfg.provider {
            LlmProvider::Ollama => format!("{base}/api/tags"),
            LlmProvider::OpenAi => format!("{base}/v1/models"),
        };

        debug!(%url, "health probe");

        let mut req = self.client.get(&url);
        if let (LlmProvider::OpenAi, Some(key)) = (cfg.provider, cfg.api_key.as_deref()) {
            req = req.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let (ok, message) = match req.send().await {
            Ok(resp) if resp.status().is_success() => (true, "reachable".to_string()),
            Ok(resp) => (false, format!("HTTP {}", resp.status())),
            Err(e) => {
                warn!(error = %e, %url, "health probe failed");
                (false, e.to_string())
            }
        };

        HealthStatus {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms: started.elapsed().as_millis(),
            message,
        }
    }
}
