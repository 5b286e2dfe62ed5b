//! Shared LLM service for the customer-service agent.
//!
//! Exposes three logical profiles — **router** (low temperature, JSON
//! classification), **reply** (customer-facing generation) and **embedding**
//! (query vectors for retrieval) — over interchangeable providers
//! (local Ollama, OpenAI-compatible APIs).
//!
//! Construct [`service_profiles::LlmServiceProfiles`] once at startup, wrap it
//! in an `Arc`, and pass clones to dependents.

pub mod config {
    pub mod default_config;
    pub mod llm_model_config;
    pub mod llm_provider;
}

pub mod error_handler;
pub mod health_service;
pub mod service_profiles;

pub mod services {
    pub mod ollama_service;
    pub mod open_ai_service;
}

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{LlmError, Result};
pub use service_profiles::LlmServiceProfiles;
