//! Mock torrent session for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::session::{
    FilePriority, FileRecord, SessionError, SessionStats, TorrentId, TorrentRecord,
    TorrentSession,
};
use crate::sync::FileIntent;

/// Session call an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    FetchTorrents,
    FetchFiles,
    SessionStats,
    /// `set_file_priority` and `set_files_wanted`.
    SetFiles,
}

/// Mock implementation of the TorrentSession trait.
///
/// Provides controllable behavior for testing:
/// - Serve configurable torrents, files and stats
/// - Record file intents and apply them to the stored files
/// - Simulate failures and slow fetches
/// - Track how many fetches overlapped
///
/// # Example
///
/// ```rust,ignore
/// let session = MockSession::new();
/// session.set_torrents(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
/// session.set_fetch_delay(Duration::from_millis(300)).await;
///
/// // ... run the sync layer ...
///
/// assert_eq!(session.max_in_flight(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSession {
    torrents: Arc<RwLock<Vec<TorrentRecord>>>,
    files: Arc<RwLock<HashMap<TorrentId, Vec<FileRecord>>>>,
    stats: Arc<RwLock<SessionStats>>,
    /// Pending failure per operation, consumed by its next call.
    failures: Arc<RwLock<HashMap<MockOperation, SessionError>>>,
    fetch_delay: Arc<RwLock<Option<Duration>>>,
    intents: Arc<RwLock<Vec<FileIntent>>>,
    fetch_times: Arc<RwLock<Vec<Instant>>>,
    torrent_fetches: AtomicUsize,
    file_fetches: AtomicUsize,
    stats_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_torrents(&self, torrents: Vec<TorrentRecord>) {
        *self.torrents.write().await = torrents;
    }

    /// Modify one stored torrent in place.
    pub async fn update_torrent(&self, id: TorrentId, update: impl FnOnce(&mut TorrentRecord)) {
        if let Some(torrent) = self.torrents.write().await.iter_mut().find(|t| t.id == id) {
            update(torrent);
        }
    }

    pub async fn set_files(&self, id: TorrentId, files: Vec<FileRecord>) {
        self.files.write().await.insert(id, files);
    }

    pub async fn files(&self, id: TorrentId) -> Vec<FileRecord> {
        self.files.read().await.get(&id).cloned().unwrap_or_default()
    }

    pub async fn set_stats(&self, stats: SessionStats) {
        *self.stats.write().await = stats;
    }

    /// Make the next call of `operation` fail. Other operations are unaffected.
    pub async fn fail_next(&self, operation: MockOperation, error: SessionError) {
        self.failures.write().await.insert(operation, error);
    }

    /// Delay every torrent fetch by `delay`.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.write().await = Some(delay);
    }

    pub async fn recorded_intents(&self) -> Vec<FileIntent> {
        self.intents.read().await.clone()
    }

    /// Start time of every torrent fetch.
    pub async fn fetch_times(&self) -> Vec<Instant> {
        self.fetch_times.read().await.clone()
    }

    pub fn torrent_fetches(&self) -> usize {
        self.torrent_fetches.load(Ordering::SeqCst)
    }

    pub fn file_fetches(&self) -> usize {
        self.file_fetches.load(Ordering::SeqCst)
    }

    pub fn stats_fetches(&self) -> usize {
        self.stats_fetches.load(Ordering::SeqCst)
    }

    /// Highest number of torrent fetches that were outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn take_error(&self, operation: MockOperation) -> Result<(), SessionError> {
        match self.failures.write().await.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn update_files(
        &self,
        id: TorrentId,
        indices: &[usize],
        update: impl Fn(&mut FileRecord),
    ) -> Result<(), SessionError> {
        let mut files = self.files.write().await;
        let files = files.get_mut(&id).ok_or(SessionError::TorrentNotFound(id))?;
        for file in files.iter_mut().filter(|f| indices.contains(&f.index)) {
            update(file);
        }
        Ok(())
    }
}

#[async_trait]
impl TorrentSession for MockSession {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_torrents(&self) -> Result<Vec<TorrentRecord>, SessionError> {
        self.torrent_fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_times.write().await.push(Instant::now());
        let outstanding = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(outstanding, Ordering::SeqCst);

        let delay = *self.fetch_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.take_error(MockOperation::FetchTorrents).await {
            Ok(()) => Ok(self.torrents.read().await.clone()),
            Err(e) => Err(e),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_files(&self, id: TorrentId) -> Result<Vec<FileRecord>, SessionError> {
        self.file_fetches.fetch_add(1, Ordering::SeqCst);
        self.take_error(MockOperation::FetchFiles).await?;
        self.files
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::TorrentNotFound(id))
    }

    async fn session_stats(&self) -> Result<SessionStats, SessionError> {
        self.stats_fetches.fetch_add(1, Ordering::SeqCst);
        self.take_error(MockOperation::SessionStats).await?;
        Ok(*self.stats.read().await)
    }

    async fn set_file_priority(
        &self,
        id: TorrentId,
        indices: &[usize],
        priority: FilePriority,
    ) -> Result<(), SessionError> {
        self.take_error(MockOperation::SetFiles).await?;
        self.intents.write().await.push(FileIntent::PriorityChanged {
            torrent_id: id,
            indices: indices.to_vec(),
            priority,
        });
        self.update_files(id, indices, |f| f.priority = priority).await
    }

    async fn set_files_wanted(
        &self,
        id: TorrentId,
        indices: &[usize],
        wanted: bool,
    ) -> Result<(), SessionError> {
        self.take_error(MockOperation::SetFiles).await?;
        self.intents.write().await.push(FileIntent::WantedChanged {
            torrent_id: id,
            indices: indices.to_vec(),
            wanted,
        });
        self.update_files(id, indices, |f| f.wanted = wanted).await
    }
}
