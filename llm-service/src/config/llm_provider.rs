/// Backend used for text generation and embeddings.
///
/// Distinguishes between a local Ollama runtime and OpenAI-compatible HTTP
/// APIs. Adding more providers later (e.g., Anthropic, Gemini) is a matter of
/// extending this enum and the profile dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime for on-device inference.
    Ollama,
    /// OpenAI-compatible chat/embeddings API.
    OpenAi,
}

impl LlmProvider {
    /// Parse a provider from an env value (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(LlmProvider::Ollama),
            "openai" | "open_ai" | "chatgpt" => Some(LlmProvider::OpenAi),
            _ => None,
        }
    }
}
