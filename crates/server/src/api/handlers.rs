use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use trmote_core::SanitizedConfig;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Renders published since startup.
    pub revision: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        revision: state.snapshot().revision,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}
