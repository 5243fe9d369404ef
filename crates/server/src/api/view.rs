//! Read side: handlers serving the latest published view snapshot.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use trmote_core::view::{DashboardView, FileListView, ListView};
use trmote_core::ViewSnapshot;

use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct ViewErrorResponse {
    pub error: String,
}

fn not_shown(what: &str) -> (StatusCode, Json<ViewErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ViewErrorResponse {
            error: format!("No {} is currently shown", what),
        }),
    )
}

/// Whole screen state
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    Json(state.snapshot())
}

/// Per-bucket counts
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.snapshot().dashboard)
}

/// Current page of the open list
pub async fn get_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListView>, (StatusCode, Json<ViewErrorResponse>)> {
    state.snapshot().list.map(Json).ok_or_else(|| not_shown("list"))
}

/// File rows of the inspected torrent
pub async fn get_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FileListView>, (StatusCode, Json<ViewErrorResponse>)> {
    state
        .snapshot()
        .files
        .map(Json)
        .ok_or_else(|| not_shown("file list"))
}
