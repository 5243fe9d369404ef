//! Field-level change detection between rendered view state and fresh records.
//!
//! A [`Mirror`] holds the attributes of a record that were last rendered. A
//! [`CacheEntry`] wraps a mirror together with the set of fields that changed
//! since the last render; the entry is dirty while that set is non-empty.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::session::{FilePriority, FileRecord, TorrentId, TorrentRecord, TorrentStatus};

/// Set of logical fields that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<F: Ord>(BTreeSet<F>);

impl<F: Ord + Copy> ChangeSet<F> {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Copy `fresh` into `cached` when they differ, recording `field`.
    pub fn track<T: PartialEq + Clone>(&mut self, field: F, cached: &mut T, fresh: &T) {
        if *cached != *fresh {
            *cached = fresh.clone();
            self.0.insert(field);
        }
    }

    pub fn insert(&mut self, field: F) {
        self.0.insert(field);
    }

    pub fn contains(&self, field: F) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        self.0.iter().copied()
    }

    fn merge(&mut self, other: &ChangeSet<F>) {
        self.0.extend(other.0.iter().copied());
    }
}

impl<F: Ord + Copy> Default for ChangeSet<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Ord + Copy> FromIterator<F> for ChangeSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rendered copy of a record's tracked attributes.
pub trait Mirror {
    type Record;
    type Field: Ord + Copy + fmt::Debug + 'static;

    /// Every field this mirror tracks.
    const FIELDS: &'static [Self::Field];

    fn mirror(record: &Self::Record) -> Self;

    /// Compare against `fresh`, updating mismatching fields in place.
    fn diff(&mut self, fresh: &Self::Record, changed: &mut ChangeSet<Self::Field>);
}

/// Cached view state for one entity plus its pending changes.
#[derive(Debug, Clone)]
pub struct CacheEntry<M: Mirror> {
    mirror: M,
    pending: ChangeSet<M::Field>,
}

impl<M: Mirror> CacheEntry<M> {
    /// Entry for a record that has never been rendered: every field is pending.
    pub fn new(record: &M::Record) -> Self {
        Self {
            mirror: M::mirror(record),
            pending: M::FIELDS.iter().copied().collect(),
        }
    }

    /// Entry whose mirror is already on screen.
    pub fn rendered(mirror: M) -> Self {
        Self {
            mirror,
            pending: ChangeSet::new(),
        }
    }

    /// Diff `fresh` against the mirror and return the fields changed by this call.
    ///
    /// Changes accumulate until [`take_changes`](Self::take_changes) is called,
    /// so a render deferred across several fetches still sees all of them.
    pub fn compare(&mut self, fresh: &M::Record) -> ChangeSet<M::Field> {
        let mut changed = ChangeSet::new();
        self.mirror.diff(fresh, &mut changed);
        self.pending.merge(&changed);
        changed
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn value(&self) -> &M {
        &self.mirror
    }

    pub fn pending(&self) -> &ChangeSet<M::Field> {
        &self.pending
    }

    /// Consume pending changes, clearing the dirty flag.
    pub fn take_changes(&mut self) -> ChangeSet<M::Field> {
        std::mem::take(&mut self.pending)
    }

    /// Run `render` only when dirty; the flag is cleared after it returns.
    pub fn refresh_if_dirty<R>(
        &mut self,
        render: impl FnOnce(&M, &ChangeSet<M::Field>) -> R,
    ) -> Option<R> {
        if !self.is_dirty() {
            return None;
        }
        let output = render(&self.mirror, &self.pending);
        self.pending = ChangeSet::new();
        Some(output)
    }
}

/// Tracked attributes of a file row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileField {
    Have,
    Size,
    Priority,
    Wanted,
}

/// Last rendered state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMirror {
    pub index: usize,
    pub name: String,
    pub have: u64,
    pub size: u64,
    pub priority: FilePriority,
    pub wanted: bool,
}

impl FileMirror {
    pub fn is_complete(&self) -> bool {
        self.have >= self.size
    }
}

impl Mirror for FileMirror {
    type Record = FileRecord;
    type Field = FileField;

    const FIELDS: &'static [FileField] = &[
        FileField::Have,
        FileField::Size,
        FileField::Priority,
        FileField::Wanted,
    ];

    fn mirror(record: &FileRecord) -> Self {
        Self {
            index: record.index,
            name: record.name.clone(),
            have: record.bytes_completed,
            size: record.length,
            priority: record.priority,
            wanted: record.wanted,
        }
    }

    fn diff(&mut self, fresh: &FileRecord, changed: &mut ChangeSet<FileField>) {
        changed.track(FileField::Have, &mut self.have, &fresh.bytes_completed);
        changed.track(FileField::Size, &mut self.size, &fresh.length);
        changed.track(FileField::Priority, &mut self.priority, &fresh.priority);
        changed.track(FileField::Wanted, &mut self.wanted, &fresh.wanted);
    }
}

/// Tracked attributes of a torrent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentField {
    Name,
    Status,
    /// Percent done and the byte counters it derives from.
    PercentDone,
    RateDownload,
    RateUpload,
    Error,
    Warning,
    Ratio,
}

/// Last rendered state of one torrent.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentMirror {
    pub id: TorrentId,
    pub name: String,
    pub status: TorrentStatus,
    pub percent_done: f64,
    pub bytes_completed: u64,
    pub total_size: u64,
    pub rate_download: u64,
    pub rate_upload: u64,
    pub error: (i64, String),
    pub warning: String,
    pub ratio: f64,
}

impl Mirror for TorrentMirror {
    type Record = TorrentRecord;
    type Field = TorrentField;

    const FIELDS: &'static [TorrentField] = &[
        TorrentField::Name,
        TorrentField::Status,
        TorrentField::PercentDone,
        TorrentField::RateDownload,
        TorrentField::RateUpload,
        TorrentField::Error,
        TorrentField::Warning,
        TorrentField::Ratio,
    ];

    fn mirror(record: &TorrentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            status: record.status,
            percent_done: record.percent_done,
            bytes_completed: record.bytes_completed,
            total_size: record.total_size,
            rate_download: record.rate_download,
            rate_upload: record.rate_upload,
            error: (record.error, record.error_string.clone()),
            warning: record.warning.clone(),
            ratio: record.upload_ratio,
        }
    }

    fn diff(&mut self, fresh: &TorrentRecord, changed: &mut ChangeSet<TorrentField>) {
        changed.track(TorrentField::Name, &mut self.name, &fresh.name);
        changed.track(TorrentField::Status, &mut self.status, &fresh.status);
        changed.track(
            TorrentField::PercentDone,
            &mut self.percent_done,
            &fresh.percent_done,
        );
        changed.track(
            TorrentField::PercentDone,
            &mut self.bytes_completed,
            &fresh.bytes_completed,
        );
        changed.track(
            TorrentField::PercentDone,
            &mut self.total_size,
            &fresh.total_size,
        );
        changed.track(
            TorrentField::RateDownload,
            &mut self.rate_download,
            &fresh.rate_download,
        );
        changed.track(
            TorrentField::RateUpload,
            &mut self.rate_upload,
            &fresh.rate_upload,
        );
        if self.error.0 != fresh.error || self.error.1 != fresh.error_string {
            self.error = (fresh.error, fresh.error_string.clone());
            changed.insert(TorrentField::Error);
        }
        changed.track(TorrentField::Warning, &mut self.warning, &fresh.warning);
        changed.track(TorrentField::Ratio, &mut self.ratio, &fresh.upload_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn cached_file(have: u64, size: u64, priority: FilePriority, wanted: bool) -> FileMirror {
        FileMirror {
            index: 0,
            name: "disc1/track01.flac".to_string(),
            have,
            size,
            priority,
            wanted,
        }
    }

    #[test]
    fn test_compare_reports_changed_file_fields() {
        let mut entry =
            CacheEntry::rendered(cached_file(50, 100, FilePriority::Normal, true));
        let mut fresh = fixtures::file(0, "disc1/track01.flac", 100, 100);
        fresh.priority = FilePriority::High;

        let changed = entry.compare(&fresh);

        let expected: ChangeSet<FileField> =
            [FileField::Have, FileField::Priority].into_iter().collect();
        assert_eq!(changed, expected);
        assert!(entry.is_dirty());
        assert_eq!(entry.value().have, 100);
        assert_eq!(entry.value().priority, FilePriority::High);
        // fresh record is left untouched
        assert_eq!(fresh.bytes_completed, 100);
    }

    #[test]
    fn test_compare_is_idempotent() {
        let fresh = fixtures::file(0, "a.bin", 100, 40);
        let mut entry = CacheEntry::rendered(FileMirror::mirror(&fresh));

        assert!(entry.compare(&fresh).is_empty());
        assert!(!entry.is_dirty());
        assert!(entry.compare(&fresh).is_empty());
        assert!(!entry.is_dirty());
    }

    #[test]
    fn test_second_compare_after_render_is_clean() {
        let mut entry = CacheEntry::rendered(cached_file(0, 100, FilePriority::Normal, true));
        let fresh = fixtures::file(0, "a.bin", 100, 60);

        assert_eq!(entry.compare(&fresh).len(), 1);
        entry.take_changes();

        assert!(entry.compare(&fresh).is_empty());
        assert!(!entry.is_dirty());
    }

    #[test]
    fn test_changes_accumulate_until_taken() {
        let mut entry = CacheEntry::rendered(cached_file(0, 100, FilePriority::Normal, true));

        let mut first = fixtures::file(0, "a.bin", 100, 10);
        entry.compare(&first);
        first.wanted = false;
        let second = entry.compare(&first);

        assert_eq!(second.len(), 1);
        assert!(second.contains(FileField::Wanted));
        let pending = entry.take_changes();
        assert!(pending.contains(FileField::Have));
        assert!(pending.contains(FileField::Wanted));
        assert!(!entry.is_dirty());
    }

    #[test]
    fn test_new_entry_is_fully_dirty() {
        let entry: CacheEntry<FileMirror> = CacheEntry::new(&fixtures::file(2, "b", 5, 0));
        assert!(entry.is_dirty());
        assert_eq!(entry.pending().len(), FileMirror::FIELDS.len());
    }

    fn pending_on_insert<M: Mirror>(record: &M::Record) -> Vec<M::Field> {
        CacheEntry::<M>::new(record).take_changes().iter().collect()
    }

    #[test]
    fn test_new_entries_of_any_mirror_start_with_every_field() {
        let file = fixtures::file(0, "a", 1, 0);
        let torrent = fixtures::torrent(1, "Arch", TorrentStatus::Stopped);

        assert_eq!(pending_on_insert::<FileMirror>(&file), FileMirror::FIELDS.to_vec());
        assert_eq!(
            pending_on_insert::<TorrentMirror>(&torrent),
            TorrentMirror::FIELDS.to_vec()
        );
    }

    #[test]
    fn test_refresh_if_dirty_clears_after_render() {
        let mut entry: CacheEntry<FileMirror> = CacheEntry::new(&fixtures::file(0, "c", 10, 10));

        let rendered = entry.refresh_if_dirty(|mirror, changes| (mirror.is_complete(), changes.len()));
        assert_eq!(rendered, Some((true, 4)));
        assert!(!entry.is_dirty());
        assert_eq!(entry.refresh_if_dirty(|_, _| ()), None);
    }

    #[test]
    fn test_torrent_diff_tracks_progress_and_errors() {
        let record = fixtures::torrent(1, "Arch", TorrentStatus::Downloading);
        let mut entry = CacheEntry::rendered(TorrentMirror::mirror(&record));

        let mut fresh = record.clone();
        fresh.bytes_completed += 10;
        fresh.error = 2;
        fresh.error_string = "No data found".to_string();
        let changed = entry.compare(&fresh);

        let expected: ChangeSet<TorrentField> =
            [TorrentField::PercentDone, TorrentField::Error].into_iter().collect();
        assert_eq!(changed, expected);

        fresh.error_string = "Permission denied".to_string();
        assert!(entry.compare(&fresh).contains(TorrentField::Error));
    }

    #[test]
    fn test_torrent_diff_ignores_untracked_fields() {
        let record = fixtures::torrent(1, "Arch", TorrentStatus::Seeding);
        let mut entry = CacheEntry::rendered(TorrentMirror::mirror(&record));

        let mut fresh = record.clone();
        fresh.peers_getting_from_us = 12;
        fresh.download_dir = Some("/elsewhere".to_string());

        assert!(entry.compare(&fresh).is_empty());
        assert!(!entry.is_dirty());
    }
}
