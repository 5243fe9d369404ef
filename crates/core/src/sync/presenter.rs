//! Turns dirty cache entries into view models.

use std::sync::Arc;

use crate::session::{FilePriority, TorrentStatus};
use crate::view::{FileRowView, PriorityIndicator, ProgressStyle, TorrentRowView};

use super::diff::{CacheEntry, FileMirror, TorrentMirror};

const SIZE_K: f64 = 1000.0;
const SIZE_UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];

/// Formats byte counts for display.
pub trait SizeFormatter: Send + Sync {
    fn size(&self, bytes: u64) -> String;
}

/// SI units (1 kB = 1000 B), at least three significant digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecimalSizeFormatter;

impl SizeFormatter for DecimalSizeFormatter {
    fn size(&self, bytes: u64) -> String {
        if (bytes as f64) < SIZE_K {
            return format!("{} B", bytes);
        }

        let mut converted = bytes as f64 / SIZE_K;
        let mut unit = SIZE_UNITS[0];
        for next in &SIZE_UNITS[1..] {
            if converted < SIZE_K {
                break;
            }
            converted /= SIZE_K;
            unit = next;
        }

        if converted <= 9.995 {
            format!("{} {}", trunc_fixed(converted, 2), unit)
        } else {
            format!("{} {}", trunc_fixed(converted, 1), unit)
        }
    }
}

/// Format `x` with `places` decimals, truncating instead of rounding.
fn trunc_fixed(x: f64, places: usize) -> String {
    let factor = 10f64.powi(places as i32);
    format!("{:.*}", places, (x * factor).floor() / factor)
}

/// Percentages keep more decimals the smaller they are.
pub fn percent_string(x: f64) -> String {
    if x < 10.0 {
        trunc_fixed(x, 2)
    } else if x < 100.0 {
        trunc_fixed(x, 1)
    } else {
        trunc_fixed(x, 0)
    }
}

fn ratio_string(ratio: f64) -> String {
    if ratio == -1.0 {
        "None".to_string()
    } else if ratio == -2.0 {
        "\u{221e}".to_string()
    } else {
        percent_string(ratio)
    }
}

/// Builds row view models from cached mirrors.
#[derive(Clone)]
pub struct RowPresenter {
    formatter: Arc<dyn SizeFormatter>,
}

impl Default for RowPresenter {
    fn default() -> Self {
        Self::new(Arc::new(DecimalSizeFormatter))
    }
}

impl RowPresenter {
    pub fn new(formatter: Arc<dyn SizeFormatter>) -> Self {
        Self { formatter }
    }

    fn progress_text(&self, have: u64, size: u64, percent: f64) -> String {
        format!(
            "{} / {} ({}%)",
            self.formatter.size(have),
            self.formatter.size(size),
            percent_string(percent)
        )
    }

    pub fn present_file(&self, file: &FileMirror) -> FileRowView {
        let percent = if file.size == 0 {
            100.0
        } else {
            file.have as f64 / file.size as f64 * 100.0
        };

        FileRowView {
            index: file.index,
            name: file.name.clone(),
            progress_text: self.progress_text(file.have, file.size, percent),
            is_excluded: !file.wanted,
            is_complete: file.is_complete(),
            priority_indicator: match file.priority {
                FilePriority::Low => PriorityIndicator::Low,
                FilePriority::Normal => PriorityIndicator::Normal,
                FilePriority::High => PriorityIndicator::High,
            },
        }
    }

    /// Present the row if it is dirty, clearing the flag afterwards.
    pub fn refresh_file(&self, entry: &mut CacheEntry<FileMirror>) -> Option<FileRowView> {
        entry.refresh_if_dirty(|file, _| self.present_file(file))
    }

    pub fn present_torrent(&self, torrent: &TorrentMirror) -> TorrentRowView {
        let percent = torrent.percent_done * 100.0;
        let has_error = torrent.error.0 != 0;
        let progress_style = if has_error {
            ProgressStyle::Error
        } else if !torrent.warning.is_empty() {
            ProgressStyle::Warning
        } else {
            match torrent.status {
                TorrentStatus::CheckWait | TorrentStatus::Checking => ProgressStyle::Check,
                TorrentStatus::DownloadWait | TorrentStatus::Downloading => {
                    ProgressStyle::Download
                }
                TorrentStatus::SeedWait | TorrentStatus::Seeding => ProgressStyle::Seed,
                TorrentStatus::Stopped | TorrentStatus::Unknown(_) => ProgressStyle::Stopped,
            }
        };

        TorrentRowView {
            id: torrent.id,
            name: torrent.name.clone(),
            status: torrent.status,
            status_text: torrent.status.label().to_string(),
            progress_text: self.progress_text(
                torrent.bytes_completed,
                torrent.total_size,
                percent,
            ),
            percent_text: format!("{}%", percent_string(percent)),
            progress_style,
            rate_download: torrent.rate_download,
            rate_upload: torrent.rate_upload,
            ratio_text: ratio_string(torrent.ratio),
            has_error,
            error_text: has_error.then(|| torrent.error.1.clone()),
            warning: (!torrent.warning.is_empty()).then(|| torrent.warning.clone()),
        }
    }

    pub fn refresh_torrent(&self, entry: &mut CacheEntry<TorrentMirror>) -> Option<TorrentRowView> {
        entry.refresh_if_dirty(|torrent, _| self.present_torrent(torrent))
    }
}
