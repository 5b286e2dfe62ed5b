use std::{env, sync::Arc};

mod core;
mod error_handler;
mod routes;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tokio::signal;
use tracing::info;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};
use crate::routes::{
    chat::chat_route::chat,
    health_route::health,
    tickets::{
        get_ticket_route::get_ticket, list_tickets_route::list_tickets,
        ticket_stats_route::ticket_stats, update_ticket_route::update_ticket,
    },
};

/// Build the state from the environment and serve until ctrl-c.
pub async fn start() -> AppResult<()> {
    let state = Arc::new(AppState::from_env()?);
    let addr = env::var("API_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let app = Router::new()
        .route("/chat", post(chat))
        .route("/tickets", get(list_tickets))
        .route("/tickets/stats", get(ticket_stats))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/{id}", patch(update_ticket))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!(target: "api", addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(target: "api", error = %e, "failed to listen for shutdown signal");
    }
}
