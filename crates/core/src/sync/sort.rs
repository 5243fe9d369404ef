//! Column ordering applied to a list before it is paged.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::{TorrentId, TorrentRecord};

/// Column a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Status,
    Progress,
    Size,
    RateDownload,
    RateUpload,
    Ratio,
    AddedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn compare(&self, a: &TorrentRecord, b: &TorrentRecord) -> Ordering {
        let ordering = match self.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Status => i64::from(a.status).cmp(&i64::from(b.status)),
            SortField::Progress => a.percent_done.total_cmp(&b.percent_done),
            SortField::Size => a.total_size.cmp(&b.total_size),
            SortField::RateDownload => a.rate_download.cmp(&b.rate_download),
            SortField::RateUpload => a.rate_upload.cmp(&b.rate_upload),
            SortField::Ratio => a.upload_ratio.total_cmp(&b.upload_ratio),
            SortField::AddedAt => a.added_at.cmp(&b.added_at),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Stable sort of `ids`; equal rows keep their bucket order. Ids without a
    /// record compare equal to everything.
    pub fn sort(&self, ids: &mut [TorrentId], records: &HashMap<TorrentId, TorrentRecord>) {
        ids.sort_by(|a, b| match (records.get(a), records.get(b)) {
            (Some(a), Some(b)) => self.compare(a, b),
            _ => Ordering::Equal,
        });
    }
}
