//! End-to-end tests of the sync runner against a mock session.
//!
//! All tests run on a paused clock: time only moves when every task is idle,
//! which makes fetch timing exact.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use trmote_core::session::{SessionError, SessionStats, TorrentStatus};
use trmote_core::sync::{
    BucketName, ListKey, PageRequest, SchedulerStats, SortField, SortKey, SortOrder, SyncHandle,
    SyncOrchestrator, SyncRunner,
};
use trmote_core::testing::{fixtures, MockOperation, MockSession, RecordingSink, SinkEvent};
use trmote_core::view::{Screen, SnapshotSink};
use trmote_core::SyncConfig;

struct Harness {
    session: Arc<MockSession>,
    sink: RecordingSink,
    handle: SyncHandle,
    task: JoinHandle<SchedulerStats>,
}

impl Harness {
    fn start(config: SyncConfig, session: Arc<MockSession>) -> Self {
        let sink = RecordingSink::new();
        let orchestrator = SyncOrchestrator::new(&config, Box::new(sink.clone()));
        let (runner, handle) = SyncRunner::new(&config, session.clone(), orchestrator);
        let task = tokio::spawn(runner.run());
        Self {
            session,
            sink,
            handle,
            task,
        }
    }

    async fn stop(self) -> SchedulerStats {
        self.handle.shutdown();
        self.task.await.expect("runner panicked")
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

async fn session_with(torrents: Vec<trmote_core::TorrentRecord>) -> Arc<MockSession> {
    let session = Arc::new(MockSession::new());
    session.set_torrents(torrents).await;
    session
}

#[tokio::test(start_paused = true)]
async fn test_refreshes_during_fetch_never_overlap() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
    session.set_fetch_delay(ms(3000)).await;
    let config = SyncConfig {
        reload_interval_ms: 1000,
        ..SyncConfig::default()
    };
    let h = Harness::start(config, session);

    sleep(ms(100)).await;
    for _ in 0..5 {
        h.handle.refresh().await.unwrap();
        h.handle.count_changed().await.unwrap();
    }

    // first fetch ends at 3000, the coalesced follow-up at 6000
    sleep(ms(6400)).await;
    assert_eq!(h.session.torrent_fetches(), 2);
    assert_eq!(h.session.max_in_flight(), 1);

    let session = h.session.clone();
    let stats = h.stop().await;
    assert_eq!(stats.fetches_started, 2);
    assert_eq!(session.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_count_change_preempts_pending_timer() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
    let h = Harness::start(SyncConfig::default(), session);

    sleep(ms(1000)).await;
    assert_eq!(h.session.torrent_fetches(), 1);

    h.handle.count_changed().await.unwrap();
    sleep(ms(10)).await;

    let times = h.session.fetch_times().await;
    assert_eq!(times.len(), 2);
    assert_eq!(times[1] - times[0], ms(1000));

    // the old 5000 ms deadline was cancelled and re-armed from the forced fetch
    sleep(ms(4490)).await;
    assert_eq!(h.session.torrent_fetches(), 2);
    sleep(ms(600)).await;
    assert_eq!(h.session.torrent_fetches(), 3);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_rearms_timer() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Stopped)]).await;
    session
        .fail_next(
            MockOperation::FetchTorrents,
            SessionError::ConnectionFailed("refused".into()),
        )
        .await;
    let h = Harness::start(SyncConfig::default(), session);

    sleep(ms(10)).await;
    assert_eq!(h.session.torrent_fetches(), 1);
    assert!(h.sink.last_dashboard().is_none());

    sleep(ms(5000)).await;
    assert_eq!(h.session.torrent_fetches(), 2);
    let dashboard = h.sink.last_dashboard().unwrap();
    assert_eq!(dashboard.counts[&BucketName::Stopped], 1);

    let stats = h.stop().await;
    assert_eq!(stats.failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_download_returns_to_home() {
    let mut record = fixtures::torrent(1, "ubuntu.iso", TorrentStatus::Downloading);
    record.rate_download = 4096;
    let session = session_with(vec![record]).await;
    let h = Harness::start(SyncConfig::default(), session);

    sleep(ms(10)).await;
    h.handle
        .show_list(ListKey::Bucket(BucketName::Downloading))
        .await
        .unwrap();
    sleep(ms(10)).await;
    assert_eq!(h.sink.last_list().unwrap().rows.len(), 1);

    h.session
        .update_torrent(1, |t| {
            t.status = TorrentStatus::Seeding;
            t.percent_done = 1.0;
        })
        .await;
    h.handle.refresh().await.unwrap();
    sleep(ms(10)).await;

    assert!(matches!(h.sink.events().last(), Some(SinkEvent::Home)));
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_commands_during_fetch_apply_after_it() {
    let torrents = (1..=3)
        .map(|i| fixtures::torrent(i, "t", TorrentStatus::Seeding))
        .collect();
    let session = session_with(torrents).await;
    session.set_fetch_delay(ms(1000)).await;
    let config = SyncConfig {
        page_size: 2,
        ..SyncConfig::default()
    };
    let h = Harness::start(config, session);

    sleep(ms(100)).await;
    h.handle
        .show_list(ListKey::Bucket(BucketName::All))
        .await
        .unwrap();
    h.handle.goto_page(PageRequest::NEXT).await.unwrap();
    sleep(ms(400)).await;
    assert_eq!(h.sink.list_renders(), 0);

    sleep(ms(600)).await;
    let list = h.sink.last_list().unwrap();
    assert_eq!(list.page_number, 2);
    assert_eq!(list.page_count, 2);
    assert_eq!(list.rows.len(), 1);
    assert_eq!(list.rows[0].id, 3);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_count_change_triggers_reload_in_cycle() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
    session
        .set_stats(SessionStats {
            torrent_count: 1,
            ..SessionStats::default()
        })
        .await;
    let h = Harness::start(SyncConfig::default(), session);

    sleep(ms(1500)).await;
    assert_eq!(h.session.torrent_fetches(), 1);
    assert_eq!(h.session.stats_fetches(), 1);

    h.session
        .set_torrents(vec![
            fixtures::torrent(1, "a", TorrentStatus::Seeding),
            fixtures::torrent(2, "b", TorrentStatus::Stopped),
        ])
        .await;
    h.session
        .set_stats(SessionStats {
            torrent_count: 2,
            paused_torrent_count: 1,
            ..SessionStats::default()
        })
        .await;

    // the 5000 ms timer fetch sees new counts and queues a follow-up
    sleep(ms(3510)).await;
    assert_eq!(h.session.torrent_fetches(), 3);
    assert_eq!(h.session.stats_fetches(), 3);
    assert_eq!(h.session.max_in_flight(), 1);
    let dashboard = h.sink.last_dashboard().unwrap();
    assert_eq!(dashboard.counts[&BucketName::All], 2);
    assert_eq!(dashboard.stats.unwrap().torrent_count, 2);

    let stats = h.stop().await;
    assert_eq!(stats.forced, 2);
}

#[tokio::test(start_paused = true)]
async fn test_suspended_runner_ignores_count_changes() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
    let config = SyncConfig {
        auto_reload: false,
        ..SyncConfig::default()
    };
    let h = Harness::start(config, session);
    sleep(ms(10)).await;

    for n in 2..=5 {
        let torrents = (1..=n)
            .map(|i| fixtures::torrent(i, "t", TorrentStatus::Seeding))
            .collect();
        h.session.set_torrents(torrents).await;
        h.session
            .set_stats(SessionStats {
                torrent_count: n as u64,
                ..SessionStats::default()
            })
            .await;
        sleep(ms(5000)).await;
    }

    assert_eq!(h.session.torrent_fetches(), 1);
    assert_eq!(h.session.stats_fetches(), 1);
    assert_eq!(h.sink.last_dashboard().unwrap().counts[&BucketName::All], 1);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stats_failure_fails_the_cycle() {
    let session = session_with(vec![fixtures::torrent(1, "a", TorrentStatus::Seeding)]).await;
    session
        .fail_next(
            MockOperation::SessionStats,
            SessionError::ConnectionFailed("reset".into()),
        )
        .await;
    let h = Harness::start(SyncConfig::default(), session);

    sleep(ms(10)).await;
    assert!(h.sink.last_dashboard().is_none());

    sleep(ms(5000)).await;
    assert!(h.sink.last_dashboard().is_some());

    let stats = h.stop().await;
    assert_eq!(stats.failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sorted_folder_list() {
    let mut torrents: Vec<_> = (1..=4)
        .map(|i| {
            let mut t = fixtures::torrent(i, "t", TorrentStatus::Seeding);
            t.rate_upload = i as u64 * 10;
            t
        })
        .collect();
    torrents[3].download_dir = Some("/elsewhere".to_string());
    let session = session_with(torrents).await;
    let config = SyncConfig {
        page_size: 2,
        ..SyncConfig::default()
    };
    let h = Harness::start(config, session);
    sleep(ms(10)).await;

    h.handle
        .sort_by(Some(SortKey::new(SortField::RateUpload, SortOrder::Desc)))
        .await
        .unwrap();
    h.handle
        .show_list(ListKey::Folder("/downloads".to_string()))
        .await
        .unwrap();
    sleep(ms(10)).await;

    let list = h.sink.last_list().unwrap();
    assert_eq!(list.total, 3);
    assert_eq!(list.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_sink_publishes_state() {
    let session = session_with(vec![
        fixtures::torrent(1, "a", TorrentStatus::Seeding),
        fixtures::torrent(2, "b", TorrentStatus::Checking),
    ])
    .await;
    session
        .set_files(1, vec![fixtures::file(0, "a.mkv", 1000, 1000)])
        .await;

    let config = SyncConfig::default();
    let (sink, rx) = SnapshotSink::new();
    let orchestrator = SyncOrchestrator::new(&config, Box::new(sink));
    let (runner, handle) = SyncRunner::new(&config, session.clone(), orchestrator);
    let task = tokio::spawn(runner.run());

    sleep(ms(10)).await;
    handle
        .show_list(ListKey::Bucket(BucketName::Checking))
        .await
        .unwrap();
    handle.inspect(Some(1)).await.unwrap();
    sleep(ms(10)).await;

    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.screen, Screen::List);
    assert_eq!(snapshot.list.unwrap().rows[0].id, 2);
    let files = snapshot.files.unwrap();
    assert_eq!(files.torrent_id, 1);
    assert!(files.rows[0].is_complete);
    assert_eq!(session.file_fetches(), 1);

    handle.shutdown();
    task.await.unwrap();
}
