//! Runtime configuration for the agent pipeline.

/// Ticket stage label for escalations requested by the router.
pub const STAGE_ROUTER: &str = "router";
/// Ticket stage label for escalations forced by the quality gate.
pub const STAGE_QUALITY_GATE: &str = "quality_gate";

/// Config bag for the pipeline. All fields have defaults via `from_env`.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Exchanges of history injected into prompts.
    pub memory_window: usize,
    /// Reuse an open ticket per session instead of stacking new ones.
    pub dedupe_open_tickets: bool,
    /// SQLite file shared by memory and tickets.
    pub db_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            memory_window: 5,
            dedupe_open_tickets: false,
            db_path: "cs_agent.db".to_string(),
        }
    }
}

impl AgentConfig {
    /// Build from environment variables with defaults for anything missing.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            memory_window: std::env::var("MEMORY_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.memory_window),
            dedupe_open_tickets: std::env::var("TICKETS_DEDUPE_OPEN")
                .map(|s| s == "true")
                .unwrap_or(d.dedupe_open_tickets),
            db_path: std::env::var("DATABASE_PATH").unwrap_or(d.db_path),
        }
    }
}
