use crate::config::llm_provider::LlmProvider;

/// Configuration for one LLM model invocation target.
///
/// One instance per logical profile (router/reply/embedding); the same struct
/// works for both providers, with `api_key` only relevant for OpenAI.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend (Ollama, OpenAI).
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"qwen3:14b"`, `"gpt-4o-mini"`).
    pub model: String,

    /// Inference endpoint (local URL or remote API base).
    pub endpoint: String,

    /// Optional API key for authentication (OpenAI).
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature. The router profile wants this low so the JSON
    /// classification stays consistent; the reply profile wants it higher.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}
