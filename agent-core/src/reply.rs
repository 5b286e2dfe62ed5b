//! Customer-facing reply generation with total fallbacks.

use tracing::warn;

use crate::llm::TextGeneration;
use crate::prompt::reply_prompt;

/// Apology sent when reply generation itself fails. The customer never sees
/// a raw error.
pub const TECHNICAL_FALLBACK: &str = "Maaf, ada kendala teknis sementara. \
Tim kami akan segera membantu Anda. Terima kasih atas pengertiannya! 🙏";

/// Generate a reply through the reply profile.
///
/// Total: any LLM failure returns [`TECHNICAL_FALLBACK`].
pub async fn generate_reply(
    svc: &dyn TextGeneration,
    message: &str,
    context: &str,
    history: &str,
    hedge: bool,
) -> String {
    let prompt = reply_prompt(message, context, history, hedge);
    match svc.reply_text(&prompt).await {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                warn!(target: "agent_core::reply", "model returned empty reply, using fallback");
                TECHNICAL_FALLBACK.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!(target: "agent_core::reply", error = %e, "reply generation failed, using fallback");
            TECHNICAL_FALLBACK.to_string()
        }
    }
}

/// Fixed handoff message when a conversation escalates to a human agent.
pub fn handoff_reply() -> String {
    "Baik, permintaan Anda sudah kami teruskan ke tim CS kami. \
Mohon ditunggu ya, tim kami akan segera menghubungi Anda. 🙏"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_is_customer_friendly() {
        let r = handoff_reply();
        assert!(r.contains("CS"));
        assert!(!r.is_empty());
    }
}
