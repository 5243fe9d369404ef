pub mod config;
pub mod session;
pub mod sync;
pub mod testing;
pub mod view;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, SessionConfig, SyncConfig,
};
pub use session::{
    FilePriority, FileRecord, SessionError, SessionStats, TorrentId, TorrentRecord,
    TorrentSession, TorrentStatus, TransmissionSession,
};
pub use sync::{
    BucketName, FileIntent, ListKey, PageRequest, SortField, SortKey, SortOrder, SyncCommand,
    SyncError, SyncHandle, SyncOrchestrator, SyncRunner,
};
pub use view::{SnapshotSink, ViewSink, ViewSnapshot};
