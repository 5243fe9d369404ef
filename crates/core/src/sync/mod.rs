//! Client-side synchronization with a remote torrent session.
//!
//! The pieces, leaf first:
//! - [`diff`]: field-level comparison of fresh records against rendered state
//! - [`cache`]: dirty-tracked row caches for torrents and the inspected torrent's files
//! - [`presenter`]: view models for dirty rows
//! - [`bucket`]: status classification, rebuilt every cycle
//! - [`sort`]: optional column order applied before paging
//! - [`pager`]: fixed-size pages over the listed bucket
//! - [`scheduler`]: poll timing with at most one fetch in flight
//! - [`orchestrator`]: applies each fetch result to all of the above
//! - [`runner`]: the tokio task tying the scheduler to the orchestrator

pub mod bucket;
pub mod cache;
pub mod diff;
pub mod orchestrator;
pub mod pager;
pub mod presenter;
pub mod runner;
pub mod scheduler;
pub mod sort;
mod stats;
mod types;

pub use bucket::{BucketName, Buckets, StatusBucketer};
pub use cache::{FileCache, FileSync, TorrentRowCache};
pub use diff::{CacheEntry, ChangeSet, FileField, FileMirror, Mirror, TorrentField, TorrentMirror};
pub use orchestrator::{ListKey, SessionSnapshot, SyncOrchestrator, ViewMode};
pub use pager::{PageRequest, PageStep, Pager};
pub use presenter::{percent_string, DecimalSizeFormatter, RowPresenter, SizeFormatter};
pub use runner::{SyncHandle, SyncRunner};
pub use scheduler::{
    ForceOutcome, NextStep, PollScheduler, SchedulerState, SchedulerStats, TickOutcome,
};
pub use sort::{SortField, SortKey, SortOrder};
pub use stats::CountTracker;
pub use types::{FileIntent, SyncCommand, SyncError};
