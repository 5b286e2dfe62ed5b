//! DTOs for the ticket endpoints.

use serde::{Deserialize, Serialize};

use services::Ticket;

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub resolution_note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketDto {
    pub id: String,
    pub session_id: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub escalation_stage: String,
    pub escalation_reason: String,
    pub original_query: String,
    pub history_snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

impl From<Ticket> for TicketDto {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            session_id: t.session_id,
            channel: t.channel,
            user_id: t.user_id,
            username: t.username,
            chat_id: t.chat_id,
            escalation_stage: t.escalation_stage,
            escalation_reason: t.escalation_reason,
            original_query: t.original_query,
            history_snippet: t.history_snippet,
            quality_score: t.quality_score,
            status: t.status.as_str().to_string(),
            assigned_to: t.assigned_to,
            resolution_note: t.resolution_note,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
            resolved_at: t.resolved_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketDto>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}
