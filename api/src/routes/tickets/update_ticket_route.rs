//! PATCH /tickets/{id} — operator updates: status, assignee, note.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use services::{TicketStatus, TicketUpdate};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::tickets::ticket_models::{TicketDto, UpdateTicketRequest},
};

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTicketRequest>,
) -> AppResult<Json<TicketDto>> {
    let status = body
        .status
        .as_deref()
        .map(TicketStatus::parse)
        .transpose()?;

    let ticket = state.tickets.update(
        &id,
        TicketUpdate {
            status,
            assigned_to: body.assigned_to,
            resolution_note: body.resolution_note,
        },
    )?;
    Ok(Json(ticket.into()))
}
