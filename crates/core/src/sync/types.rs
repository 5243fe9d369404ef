//! Commands and errors of the sync runner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{FilePriority, SessionError, TorrentId};

use super::orchestrator::ListKey;
use super::pager::PageRequest;
use super::sort::SortKey;

/// Errors surfaced to callers of [`SyncHandle`](super::SyncHandle).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync runner is not running")]
    Stopped,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// User action on one or more files of a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileIntent {
    PriorityChanged {
        torrent_id: TorrentId,
        indices: Vec<usize>,
        priority: FilePriority,
    },
    WantedChanged {
        torrent_id: TorrentId,
        indices: Vec<usize>,
        wanted: bool,
    },
}

impl FileIntent {
    pub fn torrent_id(&self) -> TorrentId {
        match self {
            FileIntent::PriorityChanged { torrent_id, .. }
            | FileIntent::WantedChanged { torrent_id, .. } => *torrent_id,
        }
    }
}

/// Messages handled by the runner task.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    /// Manual refresh.
    Refresh,
    /// The session's torrent counts changed.
    CountChanged,
    ShowList(ListKey),
    GotoPage(PageRequest),
    /// Order lists by a column, or back to bucket order with `None`.
    SortBy(Option<SortKey>),
    ShowHome,
    Inspect(Option<TorrentId>),
    File(FileIntent),
    SetAutoReload(bool),
}

impl SyncCommand {
    /// Whether this command asks for an out-of-band fetch.
    pub fn is_refresh(&self) -> bool {
        matches!(self, SyncCommand::Refresh | SyncCommand::CountChanged)
    }
}
