//! Seam over the LLM service so the pipeline can be exercised without a
//! running model backend.

use async_trait::async_trait;

use llm_service::{LlmServiceProfiles, Result};

/// The two generation calls the pipeline makes.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// Router-profile call with JSON output enforced.
    async fn router_json(&self, prompt: &str) -> Result<String>;

    /// Reply-profile call, free text.
    async fn reply_text(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl TextGeneration for LlmServiceProfiles {
    async fn router_json(&self, prompt: &str) -> Result<String> {
        self.generate_router_json(prompt, None).await
    }

    async fn reply_text(&self, prompt: &str) -> Result<String> {
        self.generate_reply(prompt, None).await
    }
}
