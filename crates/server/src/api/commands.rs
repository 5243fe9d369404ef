//! Write side: handlers forwarding user actions to the sync runner.
//!
//! Commands are applied asynchronously; a 202 means the runner accepted the
//! command, and the effect shows up in the next published snapshot.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use trmote_core::{FilePriority, ListKey, PageRequest, SortKey, SyncError, TorrentId};

use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /list/page`
#[derive(Debug, Deserialize)]
pub struct GotoPageRequest {
    /// Page number, `"next"` or `"prev"`
    pub page: PageRequest,
}

/// Body of `POST /inspect`
#[derive(Debug, Deserialize)]
pub struct InspectRequest {
    /// Torrent to inspect, or null to close the inspector
    pub torrent_id: Option<TorrentId>,
}

/// Body of `POST /files/priority`
#[derive(Debug, Deserialize)]
pub struct SetPriorityRequest {
    pub torrent_id: TorrentId,
    pub indices: Vec<usize>,
    /// -1 low, 0 normal, 1 high
    pub priority: FilePriority,
}

/// Body of `POST /files/wanted`
#[derive(Debug, Deserialize)]
pub struct SetWantedRequest {
    pub torrent_id: TorrentId,
    pub indices: Vec<usize>,
    pub wanted: bool,
}

/// Body of `POST /auto-reload`
#[derive(Debug, Deserialize)]
pub struct AutoReloadRequest {
    pub enabled: bool,
}

// ============================================================================
// Response Types
// ============================================================================

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct CommandErrorResponse {
    pub error: String,
}

type CommandResult =
    Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<CommandErrorResponse>)>;

fn accepted(result: Result<(), SyncError>, message: &str) -> CommandResult {
    match result {
        Ok(()) => Ok((
            StatusCode::ACCEPTED,
            Json(MessageResponse {
                message: message.to_string(),
            }),
        )),
        Err(e) => {
            error!("Failed to queue command: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(CommandErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<CommandErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(CommandErrorResponse {
            error: message.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Open a bucket (`{"bucket": "downloading"}`), a name search (`{"search": "..."}`),
/// a download directory (`{"folder": "..."}`) or a tracker (`{"tracker": "..."}`)
pub async fn show_list(
    State(state): State<Arc<AppState>>,
    Json(key): Json<ListKey>,
) -> CommandResult {
    match &key {
        ListKey::Search(text) if text.trim().is_empty() => {
            return Err(bad_request("Search text must not be empty"));
        }
        ListKey::Folder(dir) if dir.trim().is_empty() => {
            return Err(bad_request("Folder must not be empty"));
        }
        ListKey::Tracker(name) if name.trim().is_empty() => {
            return Err(bad_request("Tracker must not be empty"));
        }
        _ => {}
    }
    accepted(state.sync().show_list(key).await, "List requested")
}

/// Order lists by a column: `{"field": "rate_download", "order": "desc"}`
pub async fn sort_list(
    State(state): State<Arc<AppState>>,
    Json(sort): Json<SortKey>,
) -> CommandResult {
    accepted(state.sync().sort_by(Some(sort)).await, "Sort updated")
}

pub async fn clear_sort(State(state): State<Arc<AppState>>) -> CommandResult {
    accepted(state.sync().sort_by(None).await, "Sort cleared")
}

pub async fn goto_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GotoPageRequest>,
) -> CommandResult {
    accepted(state.sync().goto_page(request.page).await, "Page requested")
}

pub async fn show_home(State(state): State<Arc<AppState>>) -> CommandResult {
    accepted(state.sync().show_home().await, "Home requested")
}

pub async fn inspect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InspectRequest>,
) -> CommandResult {
    accepted(
        state.sync().inspect(request.torrent_id).await,
        "Inspection updated",
    )
}

pub async fn set_priority(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetPriorityRequest>,
) -> CommandResult {
    if request.indices.is_empty() {
        return Err(bad_request("No file indices given"));
    }
    accepted(
        state
            .sync()
            .set_file_priority(request.torrent_id, request.indices, request.priority)
            .await,
        "Priority change queued",
    )
}

pub async fn set_wanted(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetWantedRequest>,
) -> CommandResult {
    if request.indices.is_empty() {
        return Err(bad_request("No file indices given"));
    }
    accepted(
        state
            .sync()
            .set_files_wanted(request.torrent_id, request.indices, request.wanted)
            .await,
        "Wanted change queued",
    )
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> CommandResult {
    accepted(state.sync().refresh().await, "Refresh requested")
}

pub async fn set_auto_reload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AutoReloadRequest>,
) -> CommandResult {
    let message = if request.enabled {
        "Auto reload enabled"
    } else {
        "Auto reload disabled"
    };
    accepted(state.sync().set_auto_reload(request.enabled).await, message)
}
