//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`TorrentSession`](crate::session::TorrentSession)
//! and a recording [`ViewSink`](crate::view::ViewSink), so the sync layer can
//! be driven end to end without a running Transmission daemon.
//!
//! # Example
//!
//! ```rust,ignore
//! use trmote_core::testing::{fixtures, MockSession, RecordingSink};
//!
//! let session = Arc::new(MockSession::new());
//! session.set_torrents(vec![fixtures::torrent(1, "Debian", TorrentStatus::Seeding)]).await;
//!
//! let sink = RecordingSink::new();
//! let orchestrator = SyncOrchestrator::new(&config, Box::new(sink.clone()));
//! // ... run, then inspect sink.events() ...
//! ```

mod mock_session;
mod recording_sink;

pub use mock_session::{MockOperation, MockSession};
pub use recording_sink::{RecordingSink, SinkEvent};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::session::{FilePriority, FileRecord, TorrentId, TorrentRecord, TorrentStatus};

    /// Create a test torrent with reasonable defaults: half done, idle,
    /// no error and no warning.
    pub fn torrent(id: TorrentId, name: &str, status: TorrentStatus) -> TorrentRecord {
        TorrentRecord {
            id,
            name: name.to_string(),
            status,
            percent_done: 0.5,
            total_size: 1024 * 1024 * 100, // 100 MiB
            bytes_completed: 1024 * 1024 * 50,
            rate_download: 0,
            rate_upload: 0,
            peers_sending_to_us: 0,
            peers_getting_from_us: 0,
            upload_ratio: 0.0,
            error: 0,
            error_string: String::new(),
            warning: String::new(),
            added_at: None,
            download_dir: Some("/downloads".to_string()),
            trackers: Vec::new(),
            eta_secs: None,
        }
    }

    /// Create a wanted, normal priority file.
    pub fn file(index: usize, name: &str, length: u64, completed: u64) -> FileRecord {
        FileRecord {
            index,
            name: name.to_string(),
            length,
            bytes_completed: completed,
            wanted: true,
            priority: FilePriority::Normal,
        }
    }
}
