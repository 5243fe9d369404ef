//! Detects torrent count changes between fetch cycles.

use crate::session::SessionStats;

/// Remembers the last seen torrent counts.
#[derive(Debug, Default, Clone)]
pub struct CountTracker {
    last: Option<(u64, u64, u64)>,
}

impl CountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `stats`, returning true if any count differs from the previous
    /// observation. The first observation only records.
    pub fn observe(&mut self, stats: &SessionStats) -> bool {
        let counts = (
            stats.torrent_count,
            stats.active_torrent_count,
            stats.paused_torrent_count,
        );
        let changed = matches!(self.last, Some(previous) if previous != counts);
        self.last = Some(counts);
        changed
    }
}
