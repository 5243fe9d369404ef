//! Per-entity view caches built on [`CacheEntry`].

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::session::{FileRecord, TorrentId, TorrentRecord};

use super::diff::{CacheEntry, FileMirror, TorrentMirror};

/// How a [`FileCache`] absorbed a fresh file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSync {
    /// Cache was rebuilt; every row is dirty.
    Rebuilt,
    /// Rows were compared in place; `dirty` of them now need a render.
    Compared { dirty: usize },
}

/// Cached file rows of the single torrent being inspected.
#[derive(Debug, Default)]
pub struct FileCache {
    torrent_id: Option<TorrentId>,
    rows: Vec<CacheEntry<FileMirror>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn torrent_id(&self) -> Option<TorrentId> {
        self.torrent_id
    }

    pub fn rows(&self) -> &[CacheEntry<FileMirror>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [CacheEntry<FileMirror>] {
        &mut self.rows
    }

    /// Absorb the file list fetched for `torrent_id`.
    ///
    /// A different torrent or a different file count invalidates the whole
    /// list, otherwise rows are compared by index.
    pub fn sync(&mut self, torrent_id: TorrentId, files: &[FileRecord]) -> FileSync {
        if self.torrent_id != Some(torrent_id) || self.rows.len() != files.len() {
            debug!(
                "Rebuilding file cache for torrent {} ({} files)",
                torrent_id,
                files.len()
            );
            self.torrent_id = Some(torrent_id);
            self.rows = files.iter().map(CacheEntry::<FileMirror>::new).collect();
            return FileSync::Rebuilt;
        }

        for (entry, file) in self.rows.iter_mut().zip(files) {
            entry.compare(file);
        }
        FileSync::Compared {
            dirty: self.rows.iter().filter(|e| e.is_dirty()).count(),
        }
    }

    pub fn clear(&mut self) {
        self.torrent_id = None;
        self.rows.clear();
    }
}

/// Cached torrent rows keyed by id.
#[derive(Debug, Default)]
pub struct TorrentRowCache {
    entries: HashMap<TorrentId, CacheEntry<TorrentMirror>>,
}

impl TorrentRowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare every record against its entry, creating missing entries and
    /// dropping entries whose torrent is gone. Returns the ids removed.
    pub fn sync(&mut self, records: &[TorrentRecord]) -> Vec<TorrentId> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            seen.insert(record.id);
            match self.entries.get_mut(&record.id) {
                Some(entry) => {
                    entry.compare(record);
                }
                None => {
                    self.entries.insert(record.id, CacheEntry::new(record));
                }
            }
        }

        let removed: Vec<TorrentId> = self
            .entries
            .keys()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect();
        for id in &removed {
            self.entries.remove(id);
        }
        removed
    }

    pub fn get(&self, id: TorrentId) -> Option<&CacheEntry<TorrentMirror>> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: TorrentId) -> Option<&mut CacheEntry<TorrentMirror>> {
        self.entries.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
