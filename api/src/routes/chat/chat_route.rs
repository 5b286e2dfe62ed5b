//! POST /chat — single entry point into the query-processing pipeline.

use std::sync::Arc;
use std::time::Instant;

use axum::{Json, extract::State};
use chrono::Utc;
use tracing::info;

use agent_core::IncomingQuery;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::{ChatRequest, ChatResponse, MAX_MESSAGE_CHARS},
};

/// Handler: POST /chat
///
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat \
///   -H 'content-type: application/json' \
///   -d '{"message":"Bagaimana cara return barang?","session_id":"demo"}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let chars = body.message.chars().count();
    if chars == 0 || chars > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "message must be 1..={MAX_MESSAGE_CHARS} characters"
        )));
    }

    let started = Instant::now();
    // The web channel gets its own session namespace, like every channel.
    let session_id = format!("web_{}", body.session_id);
    let message_id = format!("{}", Utc::now().timestamp_micros());

    let result = state
        .pipeline
        .process(IncomingQuery {
            session_id,
            channel: "web".to_string(),
            message_id,
            text: body.message.clone(),
            user_id: None,
            username: body.username.clone(),
            chat_id: None,
        })
        .await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        target: "api::chat",
        session_id = %body.session_id,
        routing = %result.routing_decision,
        escalated = result.escalated,
        elapsed_ms,
        "chat processed"
    );

    Ok(Json(ChatResponse {
        reply: result.reply,
        routing_decision: result.routing_decision,
        escalated: result.escalated,
        reformulated_query: result.reformulated_query,
        quality_score: result.quality_score,
        flagged_for_review: result.flagged_for_review,
        escalation_reason: result.escalation_reason,
        escalation_stage: result.escalation_stage,
        ticket_id: result.ticket_id,
        session_id: body.session_id,
        processing_time_ms: (elapsed_ms * 100.0).round() / 100.0,
        timestamp: Utc::now().to_rfc3339(),
    }))
}
