//! Profile configs loaded strictly from environment variables.
//!
//! Three roles, built from a common provider selection:
//!
//! - **router**    → low temperature, used for the unified routing call
//! - **reply**     → customer-facing generation (falls back to router model)
//! - **embedding** → query embeddings for knowledge retrieval
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`   = `ollama` (default) or `openai`
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` = mandatory when `LLM_PROVIDER=openai`
//! - `OPENAI_URL`     = optional base, default `https://api.openai.com`
//!
//! Models:
//! - `LLM_ROUTER_MODEL` (mandatory)
//! - `LLM_REPLY_MODEL`  (optional, defaults to the router model)
//! - `EMBEDDING_MODEL`  (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{ConfigError, LlmError, env_opt_u32, must_env},
};

/// Resolves the configured provider from `LLM_PROVIDER` (default: Ollama).
///
/// # Errors
/// [`ConfigError::UnsupportedProvider`] when the variable is set to an
/// unknown value.
pub fn provider_from_env() -> Result<LlmProvider, LlmError> {
    match std::env::var("LLM_PROVIDER") {
        Ok(v) if !v.trim().is_empty() => {
            LlmProvider::parse(&v).ok_or_else(|| ConfigError::UnsupportedProvider(v).into())
        }
        _ => Ok(LlmProvider::Ollama),
    }
}

/// Resolves the endpoint for the configured provider.
///
/// Ollama precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn endpoint_for(provider: LlmProvider) -> Result<String, LlmError> {
    match provider {
        LlmProvider::Ollama => {
            if let Ok(url) = std::env::var("OLLAMA_URL") {
                if !url.trim().is_empty() {
                    return Ok(url);
                }
            }
            if let Ok(port) = std::env::var("OLLAMA_PORT") {
                if !port.trim().is_empty() {
                    let _ = port
                        .parse::<u16>()
                        .map_err(|_| ConfigError::InvalidNumber {
                            var: "OLLAMA_PORT",
                            reason: "expected u16 (1..=65535)",
                        })?;
                    return Ok(format!("http://localhost:{port}"));
                }
            }
            Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
        }
        LlmProvider::OpenAi => Ok(std::env::var("OPENAI_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.openai.com".to_string())),
    }
}

/// API key is mandatory for OpenAI, unused for Ollama.
///
/// A missing key aborts startup; this is the one unrecoverable configuration
/// failure the pipeline does not paper over.
fn api_key_for(provider: LlmProvider) -> Result<Option<String>, LlmError> {
    match provider {
        LlmProvider::Ollama => Ok(None),
        LlmProvider::OpenAi => must_env("OPENAI_API_KEY").map(Some),
    }
}

/// Config for the **router** profile (JSON classification, temperature 0.2).
pub fn config_router() -> Result<LlmModelConfig, LlmError> {
    let provider = provider_from_env()?;
    Ok(LlmModelConfig {
        provider,
        model: must_env("LLM_ROUTER_MODEL")?,
        endpoint: endpoint_for(provider)?,
        api_key: api_key_for(provider)?,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(30),
    })
}

/// Config for the **reply** profile (customer-facing text, temperature 0.7).
///
/// Returns `None` when `LLM_REPLY_MODEL` is unset; the profile service then
/// reuses the router model with reply-tuned sampling.
pub fn config_reply() -> Result<Option<LlmModelConfig>, LlmError> {
    let model = match std::env::var("LLM_REPLY_MODEL") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return Ok(None),
    };
    let provider = provider_from_env()?;
    Ok(Some(LlmModelConfig {
        provider,
        model,
        endpoint: endpoint_for(provider)?,
        api_key: api_key_for(provider)?,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.7),
        top_p: None,
        timeout_secs: Some(60),
    }))
}

/// Config for the **embedding** profile.
pub fn config_embedding() -> Result<LlmModelConfig, LlmError> {
    let provider = provider_from_env()?;
    Ok(LlmModelConfig {
        provider,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint: endpoint_for(provider)?,
        api_key: api_key_for(provider)?,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(15),
    })
}
