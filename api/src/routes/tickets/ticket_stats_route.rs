//! GET /tickets/stats — counts per status and mean resolution time.

use std::sync::Arc;

use axum::{Json, extract::State};

use services::TicketStats;

use crate::{core::app_state::AppState, error_handler::AppResult};

pub async fn ticket_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<TicketStats>> {
    let stats = state.tickets.stats()?;
    Ok(Json(stats))
}
