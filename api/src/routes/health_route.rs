//! GET /health — LLM profile reachability snapshot.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use llm_service::health_service::HealthStatus;

use crate::{core::app_state::AppState, error_handler::AppError, error_handler::AppResult};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub profiles: Vec<HealthStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> AppResult<Json<HealthResponse>> {
    let profiles = state.llm.health_all().await.map_err(|e| AppError::Http {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "HEALTH_CHECK_FAILED",
        message: e.to_string(),
    })?;
    let status = if profiles.iter().all(|p| p.ok) {
        "ok"
    } else {
        "degraded"
    };
    Ok(Json(HealthResponse { status, profiles }))
}
