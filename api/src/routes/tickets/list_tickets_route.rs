//! GET /tickets — paginated list, newest first, optional status filter.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use services::TicketStatus;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::tickets::ticket_models::{ListTicketsQuery, TicketDto, TicketListResponse},
};

const MAX_PAGE_SIZE: usize = 100;

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListTicketsQuery>,
) -> AppResult<Json<TicketListResponse>> {
    if q.page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".into()));
    }
    if q.page_size < 1 || q.page_size > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "page_size must be 1..={MAX_PAGE_SIZE}"
        )));
    }
    let status = q
        .status
        .as_deref()
        .map(TicketStatus::parse)
        .transpose()?;

    let page = state
        .tickets
        .list(status, q.page_size, (q.page - 1) * q.page_size)?;
    Ok(Json(TicketListResponse {
        tickets: page.tickets.into_iter().map(TicketDto::from).collect(),
        total: page.total,
        page: q.page,
        page_size: q.page_size,
    }))
}
