//! Liveness endpoints

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use fincopilot_core::ai::InsightBackend;

use crate::AppState;

/// Banner returned from `/`
pub const ROOT_MESSAGE: &str = "AI Finance Copilot Backend Running";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether an AI backend is configured and answering
    pub ai: bool,
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai = match state.insight {
        Some(ref generator) => generator.backend().health_check().await,
        None => false,
    };

    Json(HealthResponse { status: "ok", ai })
}
