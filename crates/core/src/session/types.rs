//! Types for remote session operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque torrent identity assigned by the remote session.
pub type TorrentId = i64;

/// Errors that can occur while talking to the remote session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(TorrentId),

    #[error("RPC call {method} failed: {result}")]
    Rpc { method: String, result: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Activity status of a torrent, as reported by the session.
///
/// Wire codes outside the known range are kept as `Unknown` so that
/// malformed upstream data never aborts a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TorrentStatus {
    /// Torrent is stopped.
    Stopped,
    /// Queued for verification.
    CheckWait,
    /// Verifying local data.
    Checking,
    /// Queued for download.
    DownloadWait,
    /// Downloading from peers.
    Downloading,
    /// Queued for seeding.
    SeedWait,
    /// Seeding to peers.
    Seeding,
    /// Code not understood by this client.
    Unknown(i64),
}

impl TorrentStatus {
    /// All statuses this client knows how to classify, in wire-code order.
    pub const KNOWN: [TorrentStatus; 7] = [
        TorrentStatus::Stopped,
        TorrentStatus::CheckWait,
        TorrentStatus::Checking,
        TorrentStatus::DownloadWait,
        TorrentStatus::Downloading,
        TorrentStatus::SeedWait,
        TorrentStatus::Seeding,
    ];

    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::Stopped => "stopped",
            TorrentStatus::CheckWait => "check_wait",
            TorrentStatus::Checking => "checking",
            TorrentStatus::DownloadWait => "download_wait",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::SeedWait => "seed_wait",
            TorrentStatus::Seeding => "seeding",
            TorrentStatus::Unknown(_) => "unknown",
        }
    }

    /// Human readable label for list rows.
    pub fn label(&self) -> &'static str {
        match self {
            TorrentStatus::Stopped => "Paused",
            TorrentStatus::CheckWait => "Queued for verification",
            TorrentStatus::Checking => "Verifying local data",
            TorrentStatus::DownloadWait => "Queued for download",
            TorrentStatus::Downloading => "Downloading",
            TorrentStatus::SeedWait => "Queued for seeding",
            TorrentStatus::Seeding => "Seeding",
            TorrentStatus::Unknown(_) => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TorrentStatus::Unknown(_))
    }
}

impl From<i64> for TorrentStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => TorrentStatus::Stopped,
            1 => TorrentStatus::CheckWait,
            2 => TorrentStatus::Checking,
            3 => TorrentStatus::DownloadWait,
            4 => TorrentStatus::Downloading,
            5 => TorrentStatus::SeedWait,
            6 => TorrentStatus::Seeding,
            other => TorrentStatus::Unknown(other),
        }
    }
}

impl From<TorrentStatus> for i64 {
    fn from(status: TorrentStatus) -> Self {
        match status {
            TorrentStatus::Stopped => 0,
            TorrentStatus::CheckWait => 1,
            TorrentStatus::Checking => 2,
            TorrentStatus::DownloadWait => 3,
            TorrentStatus::Downloading => 4,
            TorrentStatus::SeedWait => 5,
            TorrentStatus::Seeding => 6,
            TorrentStatus::Unknown(code) => code,
        }
    }
}

/// Download priority of a single file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FilePriority {
    Low,
    #[default]
    Normal,
    High,
}

impl FilePriority {
    /// Name of the `torrent-set` argument that applies this priority.
    pub fn rpc_argument(&self) -> &'static str {
        match self {
            FilePriority::Low => "priority-low",
            FilePriority::Normal => "priority-normal",
            FilePriority::High => "priority-high",
        }
    }
}

impl From<i64> for FilePriority {
    fn from(value: i64) -> Self {
        match value {
            v if v < 0 => FilePriority::Low,
            v if v > 0 => FilePriority::High,
            _ => FilePriority::Normal,
        }
    }
}

impl From<FilePriority> for i64 {
    fn from(priority: FilePriority) -> Self {
        match priority {
            FilePriority::Low => -1,
            FilePriority::Normal => 0,
            FilePriority::High => 1,
        }
    }
}

/// Snapshot of one torrent as returned by a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub id: TorrentId,
    pub name: String,
    pub status: TorrentStatus,
    /// Download progress (0.0 - 1.0).
    pub percent_done: f64,
    /// Total size in bytes.
    pub total_size: u64,
    /// Bytes verified on disk.
    pub bytes_completed: u64,
    /// Current download rate in bytes/second.
    pub rate_download: u64,
    /// Current upload rate in bytes/second.
    pub rate_upload: u64,
    pub peers_sending_to_us: u32,
    pub peers_getting_from_us: u32,
    /// Upload ratio; -1 when nothing was transferred yet, -2 when infinite.
    pub upload_ratio: f64,
    /// Non-zero when the session reports an error for this torrent.
    pub error: i64,
    pub error_string: String,
    /// Tracker warning text; empty when at least one tracker is healthy.
    pub warning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    /// Tracker names, one per distinct announce host.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trackers: Vec<String>,
    /// Estimated seconds until done (None if unknown or complete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
}

impl TorrentRecord {
    /// Whether any data is currently moving in either direction.
    pub fn is_transferring(&self) -> bool {
        self.rate_download > 0 || self.rate_upload > 0
    }

    pub fn has_error(&self) -> bool {
        self.error != 0
    }

    pub fn has_warning(&self) -> bool {
        !self.warning.is_empty()
    }
}

/// Snapshot of one file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Position inside the torrent's file list.
    pub index: usize,
    pub name: String,
    pub length: u64,
    pub bytes_completed: u64,
    pub wanted: bool,
    pub priority: FilePriority,
}

/// Aggregate counters reported by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub torrent_count: u64,
    pub active_torrent_count: u64,
    pub paused_torrent_count: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
}

/// Remote session the sync layer reads from and sends file toggles to.
#[async_trait]
pub trait TorrentSession: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch every torrent known to the session.
    async fn fetch_torrents(&self) -> Result<Vec<TorrentRecord>, SessionError>;

    /// Fetch the ordered file list of one torrent.
    async fn fetch_files(&self, id: TorrentId) -> Result<Vec<FileRecord>, SessionError>;

    /// Fetch aggregate session counters.
    async fn session_stats(&self) -> Result<SessionStats, SessionError>;

    /// Change the priority of some files of a torrent.
    async fn set_file_priority(
        &self,
        id: TorrentId,
        indices: &[usize],
        priority: FilePriority,
    ) -> Result<(), SessionError>;

    /// Mark some files of a torrent as wanted or unwanted.
    async fn set_files_wanted(
        &self,
        id: TorrentId,
        indices: &[usize],
        wanted: bool,
    ) -> Result<(), SessionError>;
}
