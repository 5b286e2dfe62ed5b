//! GET /tickets/{id}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    core::app_state::AppState, error_handler::AppResult,
    routes::tickets::ticket_models::TicketDto,
};

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<TicketDto>> {
    let ticket = state.tickets.get(&id)?;
    Ok(Json(ticket.into()))
}
