//! State updated after every fetch: caches, buckets, the paged list and the
//! inspected torrent's files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::session::{FileRecord, SessionError, SessionStats, TorrentId, TorrentRecord};
use crate::view::{DashboardView, FileRowView, ListView, TorrentRowView, ViewSink};

use super::bucket::{BucketName, Buckets, StatusBucketer};
use super::cache::{FileCache, FileSync, TorrentRowCache};
use super::pager::{PageRequest, Pager};
use super::presenter::RowPresenter;
use super::sort::SortKey;

/// Identifies the list being paged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKey {
    Bucket(BucketName),
    /// Case-insensitive substring match on torrent names.
    Search(String),
    /// Torrents saved under one download directory.
    Folder(String),
    /// Torrents announcing to one tracker.
    Tracker(String),
}

/// Which screen is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Home,
    List(ListKey),
}

/// Result of one successful fetch.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Session counters fetched at the start of the cycle.
    pub stats: Option<SessionStats>,
    pub torrents: Vec<TorrentRecord>,
    /// Files of the inspected torrent, when one is inspected and still exists.
    pub files: Option<(TorrentId, Vec<FileRecord>)>,
}

/// Owns every piece of derived view state. Only the runner task mutates it.
pub struct SyncOrchestrator {
    rows: TorrentRowCache,
    records: HashMap<TorrentId, TorrentRecord>,
    stats: Option<SessionStats>,
    row_views: HashMap<TorrentId, TorrentRowView>,
    files: FileCache,
    buckets: Buckets,
    pager: Pager<ListKey, TorrentId>,
    sort: Option<SortKey>,
    mode: ViewMode,
    inspected: Option<TorrentId>,
    presenter: RowPresenter,
    sink: Box<dyn ViewSink>,
    cycles: u64,
}

impl SyncOrchestrator {
    pub fn new(config: &SyncConfig, sink: Box<dyn ViewSink>) -> Self {
        Self::with_presenter(config, sink, RowPresenter::default())
    }

    pub fn with_presenter(
        config: &SyncConfig,
        sink: Box<dyn ViewSink>,
        presenter: RowPresenter,
    ) -> Self {
        Self {
            rows: TorrentRowCache::new(),
            records: HashMap::new(),
            stats: None,
            row_views: HashMap::new(),
            files: FileCache::new(),
            buckets: Buckets::default(),
            pager: Pager::new(config.page_size),
            sort: None,
            mode: ViewMode::Home,
            inspected: None,
            presenter,
            sink,
            cycles: 0,
        }
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn inspected(&self) -> Option<TorrentId> {
        self.inspected
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Completed fetch cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn page_number(&self) -> usize {
        self.pager.page_number()
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.sort
    }

    /// Absorb a fetch result.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.cycles += 1;

        for id in self.rows.sync(&snapshot.torrents) {
            self.row_views.remove(&id);
        }
        self.buckets = StatusBucketer::classify(&snapshot.torrents);
        self.records = snapshot
            .torrents
            .iter()
            .map(|record| (record.id, record.clone()))
            .collect();
        if snapshot.stats.is_some() {
            self.stats = snapshot.stats;
        }
        self.render_dashboard();

        if let ViewMode::List(key) = &self.mode {
            let key = key.clone();
            let had_rows = !self.pager.is_empty();
            let ids = self.list_ids(&key);
            if ids.is_empty() && had_rows {
                info!("List {:?} became empty, returning to home view", key);
                self.show_home();
            } else {
                self.pager.set_items(key, ids);
                self.render_list();
            }
        }

        if let Some(id) = self.inspected {
            match snapshot.files {
                Some((files_for, files)) if files_for == id => self.refresh_files(id, &files),
                _ if self.rows.get(id).is_none() => {
                    debug!("Inspected torrent {} is gone", id);
                    self.inspect(None);
                }
                _ => {}
            }
        }

        debug!(
            "Sync cycle {} applied: {} torrents, {} unclassified",
            self.cycles,
            self.records.len(),
            self.buckets.unclassified().len()
        );
    }

    /// Failed fetches leave the current view untouched.
    pub fn on_fetch_failed(&mut self, error: &SessionError) {
        warn!("Fetch failed, keeping stale view: {}", error);
    }

    /// Open a list and render its first page (or the current one for the same key).
    pub fn show_list(&mut self, key: ListKey) {
        let ids = self.list_ids(&key);
        self.mode = ViewMode::List(key.clone());
        self.pager.set_items(key, ids);
        self.render_list();
    }

    /// Order lists by `sort` before paging, or by bucket order when `None`.
    /// The open list keeps its page number.
    pub fn sort_by(&mut self, sort: Option<SortKey>) {
        self.sort = sort;
        if let ViewMode::List(key) = &self.mode {
            let key = key.clone();
            let ids = self.list_ids(&key);
            self.pager.set_items(key, ids);
            self.render_list();
        }
    }

    pub fn goto_page(&mut self, request: PageRequest) {
        if self.mode == ViewMode::Home {
            debug!("Ignoring page request {:?} on home view", request);
            return;
        }
        self.pager.goto(request);
        self.render_list();
    }

    pub fn show_home(&mut self) {
        self.mode = ViewMode::Home;
        self.pager.reset();
        self.sink.show_home();
    }

    /// Select the torrent whose files are mirrored. Returns true when its
    /// files still need to be fetched.
    pub fn inspect(&mut self, id: Option<TorrentId>) -> bool {
        if id == self.inspected {
            return false;
        }
        self.inspected = id;
        self.files.clear();
        self.sink.clear_files();
        id.is_some()
    }

    /// Ids of the list identified by `key`, in bucket order unless a sort
    /// key is set.
    pub fn list_ids(&self, key: &ListKey) -> Vec<TorrentId> {
        let mut ids = match key {
            ListKey::Bucket(bucket) => self.buckets.get(*bucket).to_vec(),
            ListKey::Folder(dir) => self.buckets.folder(dir).to_vec(),
            ListKey::Tracker(name) => self.buckets.tracker(name).to_vec(),
            ListKey::Search(text) => {
                let needle = text.to_lowercase();
                self.buckets
                    .get(BucketName::All)
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.records
                            .get(id)
                            .is_some_and(|r| r.name.to_lowercase().contains(&needle))
                    })
                    .collect()
            }
        };
        if let Some(sort) = &self.sort {
            sort.sort(&mut ids, &self.records);
        }
        ids
    }

    fn render_dashboard(&mut self) {
        let dashboard = DashboardView {
            counts: self.buckets.counts(),
            unclassified: self.buckets.unclassified().len(),
            folders: self.buckets.folder_counts(),
            trackers: self.buckets.tracker_counts(),
            stats: self.stats,
        };
        self.sink.render_dashboard(&dashboard);
    }

    /// Render the current page, re-presenting only dirty rows.
    fn render_list(&mut self) {
        let Some(key) = self.pager.key().cloned() else {
            return;
        };

        let page = self.pager.current_page();
        let mut rows = Vec::with_capacity(page.len());
        let mut redrawn = Vec::new();
        for id in page {
            if let Some(entry) = self.rows.get_mut(*id) {
                if let Some(view) = self.presenter.refresh_torrent(entry) {
                    redrawn.push(*id);
                    self.row_views.insert(*id, view);
                }
            }
            if let Some(view) = self.row_views.get(id) {
                rows.push(view.clone());
            }
        }

        let list = ListView {
            key,
            page_number: self.pager.page_number(),
            page_count: self.pager.page_count(),
            has_prev: self.pager.has_prev(),
            has_next: self.pager.has_next(),
            total: self.pager.len(),
            sort: self.sort,
            rows,
            redrawn,
        };
        self.sink.render_list(&list);
    }

    fn refresh_files(&mut self, torrent_id: TorrentId, files: &[FileRecord]) {
        if self.files.sync(torrent_id, files) == FileSync::Rebuilt {
            self.sink.clear_files();
        }

        let presenter = &self.presenter;
        let rows: Vec<FileRowView> = self
            .files
            .rows_mut()
            .iter_mut()
            .filter_map(|entry| presenter.refresh_file(entry))
            .collect();

        if !rows.is_empty() {
            debug!("Rendering {} file rows of torrent {}", rows.len(), torrent_id);
            self.sink.render_file_rows(torrent_id, &rows);
        }
    }
}
