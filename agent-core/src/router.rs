//! Unified router: one classification call deciding routing mode, resolved
//! intent, search reformulation, and escalation in a single JSON response.

use serde::Deserialize;
use tracing::warn;

use crate::llm::TextGeneration;
use crate::prompt::unified_processor_prompt;

/// Where to look for evidence before replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Reply without retrieval (greetings, chitchat).
    Direct,
    /// Knowledge base.
    Docs,
    /// Web search.
    Web,
    /// Knowledge base plus web.
    All,
}

impl RouteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteMode::Direct => "direct",
            RouteMode::Docs => "docs",
            RouteMode::Web => "web",
            RouteMode::All => "all",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Some(RouteMode::Direct),
            "docs" => Some(RouteMode::Docs),
            "web" => Some(RouteMode::Web),
            "all" => Some(RouteMode::All),
            _ => None,
        }
    }
}

/// Validated output of the unified classification call.
#[derive(Debug, Clone)]
pub struct UnifiedDecision {
    pub mode: RouteMode,
    pub resolved_query: String,
    pub reformulated_query: String,
    pub needs_reformulation: bool,
    pub escalate: bool,
    pub escalation_reason: String,
    pub reasoning: String,
}

impl UnifiedDecision {
    /// Safe default when classification fails for any reason: try the
    /// knowledge base with the original query, do not escalate.
    pub fn fallback(query: &str) -> Self {
        Self {
            mode: RouteMode::Docs,
            resolved_query: query.to_string(),
            reformulated_query: query.to_string(),
            needs_reformulation: false,
            escalate: false,
            escalation_reason: String::new(),
            reasoning: "Fallback response due to processing error".to_string(),
        }
    }
}

/// Model output before validation. Everything optional: the schema is only
/// trusted after the required fields are checked.
#[derive(Debug, Deserialize)]
struct RawDecision {
    routing_decision: Option<String>,
    resolved_query: Option<String>,
    reformulated_query: Option<String>,
    needs_reformulation: Option<bool>,
    escalate: Option<bool>,
    escalation_reason: Option<String>,
    reasoning: Option<String>,
}

/// Classify a query with one router-profile call.
///
/// Total: any transport, parse, or validation failure yields
/// [`UnifiedDecision::fallback`], never an error.
pub async fn classify(svc: &dyn TextGeneration, query: &str, history: &str) -> UnifiedDecision {
    let prompt = unified_processor_prompt(query, history);
    let raw = match svc.router_json(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(target: "agent_core::router", error = %e, "router call failed, using fallback");
            return UnifiedDecision::fallback(query);
        }
    };
    match parse_decision(&raw) {
        Some(decision) => decision,
        None => {
            warn!(target: "agent_core::router", raw, "router output failed validation, using fallback");
            UnifiedDecision::fallback(query)
        }
    }
}

/// Parse and validate model output. `None` on any malformed or incomplete
/// response; the caller substitutes the fallback.
fn parse_decision(raw_text: &str) -> Option<UnifiedDecision> {
    let json = strip_code_fences(raw_text);
    let raw: RawDecision = serde_json::from_str(json).ok()?;

    let mode = RouteMode::parse(&raw.routing_decision?)?;
    let resolved_query = raw.resolved_query?;
    let reformulated_query = raw.reformulated_query?;
    let escalate = raw.escalate?;
    let reasoning = raw.reasoning?;
    let needs_reformulation = raw
        .needs_reformulation
        .unwrap_or(reformulated_query != resolved_query);

    Some(UnifiedDecision {
        mode,
        resolved_query,
        reformulated_query,
        needs_reformulation,
        escalate,
        escalation_reason: raw.escalation_reason.unwrap_or_default(),
        reasoning,
    })
}

/// Models in JSON mode still occasionally wrap output in markdown fences.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY: &str = r#"{"routing_decision": "docs", "resolved_query": "prosedur return",
        "reformulated_query": "prosedur pengembalian barang", "escalate": false,
        "escalation_reason": "", "reasoning": "pertanyaan kebijakan"}"#;

    #[test]
    fn parses_happy_path() {
        let d = parse_decision(HAPPY).unwrap();
        assert_eq!(d.mode, RouteMode::Docs);
        assert_eq!(d.resolved_query, "prosedur return");
        assert!(d.needs_reformulation);
        assert!(!d.escalate);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{HAPPY}\n```");
        assert!(parse_decision(&fenced).is_some());
        let fenced_plain = format!("```\n{HAPPY}\n```");
        assert!(parse_decision(&fenced_plain).is_some());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let no_mode = r#"{"resolved_query": "a", "reformulated_query": "a",
            "escalate": false, "reasoning": "r"}"#;
        assert!(parse_decision(no_mode).is_none());
        let bad_mode = r#"{"routing_decision": "maybe", "resolved_query": "a",
            "reformulated_query": "a", "escalate": false, "reasoning": "r"}"#;
        assert!(parse_decision(bad_mode).is_none());
    }

    #[test]
    fn junk_is_rejected() {
        assert!(parse_decision("not json at all").is_none());
        assert!(parse_decision("").is_none());
    }

    #[test]
    fn needs_reformulation_inferred_from_query_difference() {
        let same = r#"{"routing_decision": "direct", "resolved_query": "sapaan",
            "reformulated_query": "sapaan", "escalate": false,
            "escalation_reason": "", "reasoning": "greeting"}"#;
        assert!(!parse_decision(same).unwrap().needs_reformulation);
    }

    #[test]
    fn explicit_needs_reformulation_wins() {
        let explicit = r#"{"routing_decision": "docs", "resolved_query": "a",
            "reformulated_query": "b", "needs_reformulation": false,
            "escalate": false, "reasoning": "r"}"#;
        assert!(!parse_decision(explicit).unwrap().needs_reformulation);
    }

    #[test]
    fn fallback_is_total_and_safe() {
        let d = UnifiedDecision::fallback("pesanan saya belum sampai");
        assert_eq!(d.mode, RouteMode::Docs);
        assert_eq!(d.reformulated_query, "pesanan saya belum sampai");
        assert!(!d.escalate);
        assert_eq!(d.escalation_reason, "");
    }
}
