//! Status classification of torrent records, plus the per-folder and
//! per-tracker groups listed next to the status buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::{TorrentId, TorrentRecord, TorrentStatus};

/// Named subset of torrents shown on the dashboard.
///
/// Status buckets are mutually exclusive. `Active`, `Error` and `Warning`
/// cut across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketName {
    All,
    Stopped,
    CheckWait,
    Checking,
    DownloadWait,
    Downloading,
    SeedWait,
    Seeding,
    Active,
    Error,
    Warning,
}

impl BucketName {
    pub const ALL: [BucketName; 11] = [
        BucketName::All,
        BucketName::Stopped,
        BucketName::CheckWait,
        BucketName::Checking,
        BucketName::DownloadWait,
        BucketName::Downloading,
        BucketName::SeedWait,
        BucketName::Seeding,
        BucketName::Active,
        BucketName::Error,
        BucketName::Warning,
    ];

    /// Status bucket for `status`, if the status is known.
    pub fn for_status(status: TorrentStatus) -> Option<BucketName> {
        match status {
            TorrentStatus::Stopped => Some(BucketName::Stopped),
            TorrentStatus::CheckWait => Some(BucketName::CheckWait),
            TorrentStatus::Checking => Some(BucketName::Checking),
            TorrentStatus::DownloadWait => Some(BucketName::DownloadWait),
            TorrentStatus::Downloading => Some(BucketName::Downloading),
            TorrentStatus::SeedWait => Some(BucketName::SeedWait),
            TorrentStatus::Seeding => Some(BucketName::Seeding),
            TorrentStatus::Unknown(_) => None,
        }
    }

    pub fn is_status(&self) -> bool {
        !matches!(
            self,
            BucketName::All | BucketName::Active | BucketName::Error | BucketName::Warning
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketName::All => "all",
            BucketName::Stopped => "stopped",
            BucketName::CheckWait => "check_wait",
            BucketName::Checking => "checking",
            BucketName::DownloadWait => "download_wait",
            BucketName::Downloading => "downloading",
            BucketName::SeedWait => "seed_wait",
            BucketName::Seeding => "seeding",
            BucketName::Active => "active",
            BucketName::Error => "error",
            BucketName::Warning => "warning",
        }
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one classification pass. Every [`BucketName`] is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    members: BTreeMap<BucketName, Vec<TorrentId>>,
    unclassified: Vec<TorrentId>,
    folders: BTreeMap<String, Vec<TorrentId>>,
    trackers: BTreeMap<String, Vec<TorrentId>>,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            members: BucketName::ALL.iter().map(|b| (*b, Vec::new())).collect(),
            unclassified: Vec::new(),
            folders: BTreeMap::new(),
            trackers: BTreeMap::new(),
        }
    }
}

impl Buckets {
    /// Ids in `bucket`, in input order.
    pub fn get(&self, bucket: BucketName) -> &[TorrentId] {
        self.members.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, bucket: BucketName) -> usize {
        self.get(bucket).len()
    }

    pub fn counts(&self) -> BTreeMap<BucketName, usize> {
        self.members.iter().map(|(b, ids)| (*b, ids.len())).collect()
    }

    /// Records whose status matched no status bucket.
    pub fn unclassified(&self) -> &[TorrentId] {
        &self.unclassified
    }

    /// Ids whose download directory is `dir`. Trailing separators are ignored.
    pub fn folder(&self, dir: &str) -> &[TorrentId] {
        self.folders
            .get(folder_key(dir))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids announcing to the tracker called `name`.
    pub fn tracker(&self, name: &str) -> &[TorrentId] {
        self.trackers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        self.folders.iter().map(|(k, ids)| (k.clone(), ids.len())).collect()
    }

    pub fn tracker_counts(&self) -> BTreeMap<String, usize> {
        self.trackers.iter().map(|(k, ids)| (k.clone(), ids.len())).collect()
    }

    /// Sum of every status and cross-cutting bucket's size.
    pub fn total_memberships(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    fn push(&mut self, bucket: BucketName, id: TorrentId) {
        self.members.entry(bucket).or_default().push(id);
    }
}

/// Rebuilds [`Buckets`] from scratch on every fetch.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusBucketer;

impl StatusBucketer {
    /// Single pass over `records`.
    pub fn classify(records: &[TorrentRecord]) -> Buckets {
        let mut buckets = Buckets::default();

        for record in records {
            buckets.push(BucketName::All, record.id);

            match BucketName::for_status(record.status) {
                Some(bucket) => buckets.push(bucket, record.id),
                None => {
                    warn!(
                        "Torrent {} has unrecognized status {:?}, leaving it unclassified",
                        record.id, record.status
                    );
                    buckets.unclassified.push(record.id);
                }
            }

            if record.is_transferring() {
                buckets.push(BucketName::Active, record.id);
            }
            if record.has_error() {
                buckets.push(BucketName::Error, record.id);
            }
            if record.has_warning() {
                buckets.push(BucketName::Warning, record.id);
            }

            if let Some(dir) = record.download_dir.as_deref() {
                buckets
                    .folders
                    .entry(folder_key(dir).to_string())
                    .or_default()
                    .push(record.id);
            }
            for tracker in &record.trackers {
                buckets
                    .trackers
                    .entry(tracker.clone())
                    .or_default()
                    .push(record.id);
            }
        }

        buckets
    }
}

fn folder_key(dir: &str) -> &str {
    let trimmed = dir.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        dir
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn sample() -> Vec<TorrentRecord> {
        let mut downloading = fixtures::torrent(1, "debian", TorrentStatus::Downloading);
        downloading.rate_download = 1_000;
        let stopped = fixtures::torrent(2, "arch", TorrentStatus::Stopped);
        let mut seeding = fixtures::torrent(3, "fedora", TorrentStatus::Seeding);
        seeding.rate_upload = 20;
        seeding.warning = "Connection refused".to_string();
        let mut checking = fixtures::torrent(4, "mint", TorrentStatus::Checking);
        checking.error = 3;
        checking.error_string = "No data found".to_string();
        vec![downloading, stopped, seeding, checking]
    }

    #[test]
    fn test_every_record_in_exactly_one_status_bucket() {
        let records = sample();
        let buckets = StatusBucketer::classify(&records);

        for record in &records {
            let hits = BucketName::ALL
                .iter()
                .filter(|b| b.is_status())
                .filter(|b| buckets.get(**b).contains(&record.id))
                .count();
            assert_eq!(hits, 1, "torrent {} in {} status buckets", record.id, hits);
        }
        assert_eq!(buckets.get(BucketName::Downloading), &[1]);
        assert_eq!(buckets.get(BucketName::Seeding), &[3]);
    }

    #[test]
    fn test_cross_cutting_buckets() {
        let buckets = StatusBucketer::classify(&sample());

        assert_eq!(buckets.get(BucketName::All), &[1, 2, 3, 4]);
        assert_eq!(buckets.get(BucketName::Active), &[1, 3]);
        assert_eq!(buckets.get(BucketName::Error), &[4]);
        assert_eq!(buckets.get(BucketName::Warning), &[3]);
    }

    #[test]
    fn test_empty_input_has_every_key() {
        let buckets = StatusBucketer::classify(&[]);
        let counts = buckets.counts();

        assert_eq!(counts.len(), BucketName::ALL.len());
        assert!(counts.values().all(|c| *c == 0));
        assert!(buckets.unclassified().is_empty());
    }

    #[test]
    fn test_unknown_status_is_unclassified_but_counted() {
        let mut records = sample();
        records.push(fixtures::torrent(9, "odd", TorrentStatus::Unknown(42)));

        let buckets = StatusBucketer::classify(&records);

        assert_eq!(buckets.unclassified(), &[9]);
        assert!(buckets.get(BucketName::All).contains(&9));
        let in_status = BucketName::ALL
            .iter()
            .filter(|b| b.is_status())
            .any(|b| buckets.get(*b).contains(&9));
        assert!(!in_status);
    }

    #[test]
    fn test_rebuild_touches_each_record_once() {
        let mut records = Vec::new();
        for id in 0..200 {
            let status = TorrentStatus::KNOWN[id as usize % TorrentStatus::KNOWN.len()];
            let mut record = fixtures::torrent(id, "t", status);
            if id % 3 == 0 {
                record.rate_download = 1;
            }
            if id % 5 == 0 {
                record.warning = "w".to_string();
            }
            records.push(record);
        }

        let buckets = StatusBucketer::classify(&records);

        let cross = records.iter().filter(|r| r.is_transferring()).count()
            + records.iter().filter(|r| r.has_error()).count()
            + records.iter().filter(|r| r.has_warning()).count();
        // one All entry plus one status entry per record
        assert_eq!(buckets.total_memberships(), records.len() * 2 + cross);
    }

    #[test]
    fn test_folders_group_by_download_dir() {
        let mut records = sample();
        records[1].download_dir = Some("/downloads/".to_string());
        records[2].download_dir = Some("/media/music".to_string());
        records[3].download_dir = None;

        let buckets = StatusBucketer::classify(&records);

        assert_eq!(buckets.folder("/downloads"), &[1, 2]);
        assert_eq!(buckets.folder("/downloads/"), &[1, 2]);
        assert_eq!(buckets.folder("/media/music"), &[3]);
        assert!(buckets.folder("/nowhere").is_empty());
        assert_eq!(buckets.folder_counts().len(), 2);
    }

    #[test]
    fn test_trackers_group_by_name() {
        let mut records = sample();
        records[0].trackers = vec!["example.org".to_string(), "other.net".to_string()];
        records[2].trackers = vec!["example.org".to_string()];

        let buckets = StatusBucketer::classify(&records);

        assert_eq!(buckets.tracker("example.org"), &[1, 3]);
        assert_eq!(buckets.tracker("other.net"), &[1]);
        assert_eq!(buckets.tracker_counts()["example.org"], 2);
        assert!(buckets.tracker("missing.org").is_empty());
    }

    #[test]
    fn test_bucket_name_serializes_snake_case() {
        let json = serde_json::to_string(&BucketName::DownloadWait).unwrap();
        assert_eq!(json, "\"download_wait\"");
        assert_eq!(BucketName::DownloadWait.to_string(), "download_wait");
    }
}
