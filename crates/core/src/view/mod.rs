//! View models handed to the rendering collaborator.
//!
//! The sync layer never renders anything itself: it prepares plain values and
//! pushes them through a [`ViewSink`].

mod snapshot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::{SessionStats, TorrentId, TorrentStatus};
use crate::sync::{BucketName, ListKey, SortKey};

pub use snapshot::{FileListView, Screen, SnapshotSink, ViewSnapshot};

/// Which of the three priority indicators a file row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityIndicator {
    Low,
    Normal,
    High,
}

/// Rendered state of one file row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRowView {
    pub index: usize,
    pub name: String,
    /// `completed / total (percent%)`
    pub progress_text: String,
    /// File is not wanted.
    pub is_excluded: bool,
    /// All bytes are on disk.
    pub is_complete: bool,
    pub priority_indicator: PriorityIndicator,
}

/// Colour family of a torrent's progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStyle {
    Stopped,
    Check,
    Download,
    Seed,
    Warning,
    Error,
}

/// Rendered state of one torrent row in a list page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRowView {
    pub id: TorrentId,
    pub name: String,
    pub status: TorrentStatus,
    pub status_text: String,
    pub progress_text: String,
    pub percent_text: String,
    pub progress_style: ProgressStyle,
    pub rate_download: u64,
    pub rate_upload: u64,
    pub ratio_text: String,
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Per-bucket counts for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub counts: BTreeMap<BucketName, usize>,
    /// Records whose status could not be classified.
    pub unclassified: usize,
    /// Torrent count per download directory.
    #[serde(default)]
    pub folders: BTreeMap<String, usize>,
    /// Torrent count per tracker name.
    #[serde(default)]
    pub trackers: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
}

/// One page of the active list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListView {
    pub key: ListKey,
    pub page_number: usize,
    pub page_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Items in the whole list, not just this page.
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKey>,
    pub rows: Vec<TorrentRowView>,
    /// Rows re-presented in this render.
    pub redrawn: Vec<TorrentId>,
}

/// Rendering collaborator.
pub trait ViewSink: Send {
    fn render_dashboard(&mut self, dashboard: &DashboardView);

    fn render_list(&mut self, list: &ListView);

    /// Receives only the file rows that changed since their last render.
    fn render_file_rows(&mut self, torrent_id: TorrentId, rows: &[FileRowView]);

    fn clear_files(&mut self);

    /// Switch to the default screen.
    fn show_home(&mut self);
}
