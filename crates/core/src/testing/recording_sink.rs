//! View sink that records every render call.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::TorrentId;
use crate::view::{DashboardView, FileRowView, ListView, ViewSink};

/// One call made on a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Dashboard(DashboardView),
    List(ListView),
    FileRows {
        torrent_id: TorrentId,
        rows: Vec<FileRowView>,
    },
    ClearFiles,
    Home,
}

/// Cloneable sink; clones share the same event log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.log().clone()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    pub fn last_dashboard(&self) -> Option<DashboardView> {
        self.log().iter().rev().find_map(|e| match e {
            SinkEvent::Dashboard(d) => Some(d.clone()),
            _ => None,
        })
    }

    pub fn last_list(&self) -> Option<ListView> {
        self.log().iter().rev().find_map(|e| match e {
            SinkEvent::List(l) => Some(l.clone()),
            _ => None,
        })
    }

    pub fn last_file_rows(&self) -> Option<Vec<FileRowView>> {
        self.log().iter().rev().find_map(|e| match e {
            SinkEvent::FileRows { rows, .. } => Some(rows.clone()),
            _ => None,
        })
    }

    /// Indices of the file rows passed to each render call, in call order.
    pub fn file_rows_rendered(&self) -> Vec<(TorrentId, Vec<usize>)> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::FileRows { torrent_id, rows } => {
                    Some((*torrent_id, rows.iter().map(|r| r.index).collect()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn list_renders(&self) -> usize {
        self.log()
            .iter()
            .filter(|e| matches!(e, SinkEvent::List(_)))
            .count()
    }
}

impl ViewSink for RecordingSink {
    fn render_dashboard(&mut self, dashboard: &DashboardView) {
        self.log().push(SinkEvent::Dashboard(dashboard.clone()));
    }

    fn render_list(&mut self, list: &ListView) {
        self.log().push(SinkEvent::List(list.clone()));
    }

    fn render_file_rows(&mut self, torrent_id: TorrentId, rows: &[FileRowView]) {
        self.log().push(SinkEvent::FileRows {
            torrent_id,
            rows: rows.to_vec(),
        });
    }

    fn clear_files(&mut self) {
        self.log().push(SinkEvent::ClearFiles);
    }

    fn show_home(&mut self) {
        self.log().push(SinkEvent::Home);
    }
}
