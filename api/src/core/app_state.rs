use std::sync::Arc;

use agent_core::{AgentConfig, AgentPipeline, TextGeneration};
use llm_service::LlmServiceProfiles;
use rag_core::{CrossEncoderClient, QdrantRetriever, RagConfig, RetrievalDeps, SearxClient};
use services::{ConversationMemory, TicketService};

use crate::error_handler::{AppError, AppResult};

const RERANKER_TIMEOUT_SECS: u64 = 15;
const WEB_SEARCH_TIMEOUT_SECS: u64 = 15;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AgentPipeline>,
    pub tickets: Arc<TicketService>,
    pub llm: Arc<LlmServiceProfiles>,
}

impl AppState {
    /// Wire the full pipeline from environment variables.
    ///
    /// The only fatal error here is invalid LLM credentials/config; retrieval
    /// and persistence collaborators use total `from_env` defaults.
    pub fn from_env() -> AppResult<Self> {
        let llm = Arc::new(LlmServiceProfiles::from_env().map_err(AppError::startup)?);

        let rag_cfg = RagConfig::from_env();
        let retrieval = RetrievalDeps {
            knowledge: Arc::new(
                QdrantRetriever::new(&rag_cfg, Arc::clone(&llm)).map_err(AppError::startup)?,
            ),
            web: Arc::new(
                SearxClient::new(rag_cfg.web_search_endpoint.clone(), WEB_SEARCH_TIMEOUT_SECS)
                    .map_err(AppError::startup)?,
            ),
            reranker: Arc::new(
                CrossEncoderClient::new(rag_cfg.reranker_endpoint.clone(), RERANKER_TIMEOUT_SECS)
                    .map_err(AppError::startup)?,
            ),
        };

        let agent_cfg = AgentConfig::from_env();
        let memory =
            Arc::new(ConversationMemory::open(&agent_cfg.db_path).map_err(AppError::startup)?);
        let tickets = Arc::new(
            TicketService::open(&agent_cfg.db_path, agent_cfg.dedupe_open_tickets)
                .map_err(AppError::startup)?,
        );

        let pipeline = Arc::new(AgentPipeline::new(
            Arc::clone(&llm) as Arc<dyn TextGeneration>,
            retrieval,
            rag_cfg,
            memory,
            Arc::clone(&tickets),
            agent_cfg,
        ));

        Ok(Self {
            pipeline,
            tickets,
            llm,
        })
    }
}
