//! The task that owns the scheduler and the orchestrator.
//!
//! Everything runs on one task: timer fires, fetch completions and commands
//! are handled one at a time, so the orchestrator never needs a lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::session::{FilePriority, SessionError, TorrentId, TorrentSession};

use super::orchestrator::{ListKey, SessionSnapshot, SyncOrchestrator};
use super::pager::PageRequest;
use super::scheduler::{ForceOutcome, NextStep, PollScheduler, SchedulerStats, TickOutcome};
use super::sort::SortKey;
use super::stats::CountTracker;
use super::types::{FileIntent, SyncCommand, SyncError};

const COMMAND_BUFFER: usize = 64;

/// Cloneable sender side of a [`SyncRunner`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncCommand>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncHandle {
    pub async fn send(&self, command: SyncCommand) -> Result<(), SyncError> {
        self.tx.send(command).await.map_err(|_| SyncError::Stopped)
    }

    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Refresh).await
    }

    pub async fn count_changed(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::CountChanged).await
    }

    pub async fn show_list(&self, key: ListKey) -> Result<(), SyncError> {
        self.send(SyncCommand::ShowList(key)).await
    }

    pub async fn goto_page(&self, request: PageRequest) -> Result<(), SyncError> {
        self.send(SyncCommand::GotoPage(request)).await
    }

    pub async fn sort_by(&self, sort: Option<SortKey>) -> Result<(), SyncError> {
        self.send(SyncCommand::SortBy(sort)).await
    }

    pub async fn show_home(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::ShowHome).await
    }

    pub async fn inspect(&self, id: Option<TorrentId>) -> Result<(), SyncError> {
        self.send(SyncCommand::Inspect(id)).await
    }

    pub async fn set_file_priority(
        &self,
        torrent_id: TorrentId,
        indices: Vec<usize>,
        priority: FilePriority,
    ) -> Result<(), SyncError> {
        self.send(SyncCommand::File(FileIntent::PriorityChanged {
            torrent_id,
            indices,
            priority,
        }))
        .await
    }

    pub async fn set_files_wanted(
        &self,
        torrent_id: TorrentId,
        indices: Vec<usize>,
        wanted: bool,
    ) -> Result<(), SyncError> {
        self.send(SyncCommand::File(FileIntent::WantedChanged {
            torrent_id,
            indices,
            wanted,
        }))
        .await
    }

    pub async fn set_auto_reload(&self, enabled: bool) -> Result<(), SyncError> {
        self.send(SyncCommand::SetAutoReload(enabled)).await
    }

    /// Ask the runner to stop, abandoning any fetch in flight.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Polls the session and applies each result to the orchestrator.
pub struct SyncRunner {
    session: Arc<dyn TorrentSession>,
    orchestrator: SyncOrchestrator,
    scheduler: PollScheduler,
    commands: mpsc::Receiver<SyncCommand>,
    shutdown_rx: broadcast::Receiver<()>,
    deferred: VecDeque<SyncCommand>,
    counts: CountTracker,
}

impl SyncRunner {
    pub fn new(
        config: &SyncConfig,
        session: Arc<dyn TorrentSession>,
        orchestrator: SyncOrchestrator,
    ) -> (Self, SyncHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let scheduler = PollScheduler::new(
            Duration::from_millis(config.reload_interval_ms),
            config.auto_reload,
        );

        let runner = Self {
            session,
            orchestrator,
            scheduler,
            commands,
            shutdown_rx,
            deferred: VecDeque::new(),
            counts: CountTracker::new(),
        };
        (runner, SyncHandle { tx, shutdown_tx })
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) -> SchedulerStats {
        info!(
            "Sync runner started against {} (auto reload: {}, every {:?})",
            self.session.name(),
            self.scheduler.auto_reload(),
            self.scheduler.interval()
        );

        self.poll().await;

        let stats = self.scheduler.stats();
        info!(
            "Sync runner stopped after {} cycles ({} fetches, {} failures)",
            self.orchestrator.cycles(),
            stats.fetches_started,
            stats.failures
        );
        stats
    }

    async fn poll(&mut self) {
        let now = Instant::now();
        self.scheduler.start(now);
        if self.scheduler.force(now) == ForceOutcome::Fetch && !self.cycle().await {
            return;
        }

        loop {
            let deadline = self.scheduler.deadline();
            let fetch = tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Sync runner received shutdown signal");
                    return;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("All sync handles dropped, stopping runner");
                        return;
                    };
                    self.handle_command(command).await
                }
                _ = sleep_until(deadline) => {
                    self.scheduler.on_timer(Instant::now()) == TickOutcome::Fetch
                }
            };
            if fetch && !self.cycle().await {
                return;
            }
        }
    }

    /// Run fetches until the scheduler has nothing queued. The scheduler has
    /// already marked the first one in flight. Returns false if shutdown was
    /// requested while a fetch was outstanding.
    async fn cycle(&mut self) -> bool {
        loop {
            let session = Arc::clone(&self.session);
            let inspected = self.orchestrator.inspected();

            let result = {
                let fetch = fetch_snapshot(session.as_ref(), inspected);
                tokio::pin!(fetch);
                loop {
                    tokio::select! {
                        result = &mut fetch => break result,
                        Some(command) = self.commands.recv() => self.defer(command),
                        _ = self.shutdown_rx.recv() => {
                            info!("Sync runner received shutdown signal, abandoning fetch");
                            return false;
                        }
                    }
                }
            };

            let succeeded = match result {
                Ok(snapshot) => {
                    let counts_changed = snapshot
                        .stats
                        .as_ref()
                        .is_some_and(|stats| self.counts.observe(stats));
                    self.orchestrator.apply_snapshot(snapshot);
                    if counts_changed {
                        debug!("Torrent counts changed, queueing a full reload");
                        self.scheduler.force(Instant::now());
                    }
                    true
                }
                Err(e) => {
                    self.orchestrator.on_fetch_failed(&e);
                    false
                }
            };

            // still in flight here, so refreshes coalesce into one follow-up
            while let Some(command) = self.deferred.pop_front() {
                self.handle_command(command).await;
            }

            match self.scheduler.complete(Instant::now(), succeeded) {
                NextStep::Fetch => debug!("Running queued refresh"),
                NextStep::WaitUntil(_) | NextStep::Suspended => return true,
            }
        }
    }

    fn defer(&mut self, command: SyncCommand) {
        if command.is_refresh() {
            self.scheduler.force(Instant::now());
        } else {
            debug!("Deferring {:?} until the fetch completes", command);
            self.deferred.push_back(command);
        }
    }

    /// Apply a command. Returns true if a fetch must start now.
    async fn handle_command(&mut self, command: SyncCommand) -> bool {
        let now = Instant::now();
        match command {
            refresh @ (SyncCommand::Refresh | SyncCommand::CountChanged) => {
                debug!("Forced refresh: {:?}", refresh);
                self.scheduler.force(now) == ForceOutcome::Fetch
            }
            SyncCommand::ShowList(key) => {
                self.orchestrator.show_list(key);
                false
            }
            SyncCommand::GotoPage(request) => {
                self.orchestrator.goto_page(request);
                false
            }
            SyncCommand::SortBy(sort) => {
                self.orchestrator.sort_by(sort);
                false
            }
            SyncCommand::ShowHome => {
                self.orchestrator.show_home();
                false
            }
            SyncCommand::Inspect(id) => {
                self.orchestrator.inspect(id) && self.scheduler.force(now) == ForceOutcome::Fetch
            }
            SyncCommand::File(intent) => {
                let session = Arc::clone(&self.session);
                if let Err(e) = dispatch(session.as_ref(), &intent).await {
                    warn!(
                        "Failed to update files of torrent {}: {}",
                        intent.torrent_id(),
                        e
                    );
                }
                self.scheduler.force(now) == ForceOutcome::Fetch
            }
            SyncCommand::SetAutoReload(enabled) => {
                info!("Auto reload {}", if enabled { "enabled" } else { "disabled" });
                if enabled {
                    self.scheduler.resume(now);
                } else {
                    self.scheduler.suspend();
                }
                false
            }
        }
    }
}

/// Forward a file intent to the session.
async fn dispatch(session: &dyn TorrentSession, intent: &FileIntent) -> Result<(), SessionError> {
    match intent {
        FileIntent::PriorityChanged {
            torrent_id,
            indices,
            priority,
        } => {
            session
                .set_file_priority(*torrent_id, indices, *priority)
                .await
        }
        FileIntent::WantedChanged {
            torrent_id,
            indices,
            wanted,
        } => session.set_files_wanted(*torrent_id, indices, *wanted).await,
    }
}

/// One fetch: session counters, every torrent, plus the inspected torrent's files.
async fn fetch_snapshot(
    session: &dyn TorrentSession,
    inspected: Option<TorrentId>,
) -> Result<SessionSnapshot, SessionError> {
    let stats = session.session_stats().await?;
    let torrents = session.fetch_torrents().await?;

    let files = match inspected {
        Some(id) if torrents.iter().any(|t| t.id == id) => match session.fetch_files(id).await {
            Ok(files) => Some((id, files)),
            Err(SessionError::TorrentNotFound(_)) => None,
            Err(e) => return Err(e),
        },
        _ => None,
    };

    Ok(SessionSnapshot {
        stats: Some(stats),
        torrents,
        files,
    })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
