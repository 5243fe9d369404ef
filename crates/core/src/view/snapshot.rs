//! A [`ViewSink`] that publishes the whole screen state over a watch channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::session::TorrentId;

use super::{DashboardView, FileRowView, ListView, ViewSink};

/// Screen currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Home,
    List,
}

/// File rows of the inspected torrent, merged across partial renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListView {
    pub torrent_id: TorrentId,
    pub rows: Vec<FileRowView>,
}

/// Everything a front end needs to draw the current state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewSnapshot {
    pub screen: Screen,
    pub dashboard: DashboardView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<FileListView>,
    /// Number of renders published so far.
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Publishes a [`ViewSnapshot`] after every render call.
pub struct SnapshotSink {
    tx: watch::Sender<ViewSnapshot>,
}

impl SnapshotSink {
    /// Create a sink and the receiver readers subscribe through.
    pub fn new() -> (Self, watch::Receiver<ViewSnapshot>) {
        let (tx, rx) = watch::channel(ViewSnapshot::default());
        (Self { tx }, rx)
    }

    fn publish(&self, update: impl FnOnce(&mut ViewSnapshot)) {
        self.tx.send_modify(|snapshot| {
            update(snapshot);
            snapshot.revision += 1;
            snapshot.updated_at = Some(Utc::now());
        });
    }
}

impl ViewSink for SnapshotSink {
    fn render_dashboard(&mut self, dashboard: &DashboardView) {
        self.publish(|s| s.dashboard = dashboard.clone());
    }

    fn render_list(&mut self, list: &ListView) {
        self.publish(|s| {
            s.screen = Screen::List;
            s.list = Some(list.clone());
        });
    }

    fn render_file_rows(&mut self, torrent_id: TorrentId, rows: &[FileRowView]) {
        self.publish(|s| {
            if s.files.as_ref().map(|f| f.torrent_id) != Some(torrent_id) {
                s.files = None;
            }
            let files = s.files.get_or_insert_with(|| FileListView {
                torrent_id,
                rows: Vec::with_capacity(rows.len()),
            });
            for row in rows {
                match files.rows.binary_search_by_key(&row.index, |r| r.index) {
                    Ok(pos) => files.rows[pos] = row.clone(),
                    Err(pos) => files.rows.insert(pos, row.clone()),
                }
            }
        });
    }

    fn clear_files(&mut self) {
        self.publish(|s| s.files = None);
    }

    fn show_home(&mut self) {
        self.publish(|s| {
            s.screen = Screen::Home;
            s.list = None;
        });
    }
}
