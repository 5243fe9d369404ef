//! Transmission JSON-RPC session implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::SessionConfig;

use super::{
    FilePriority, FileRecord, SessionError, SessionStats, TorrentId, TorrentRecord,
    TorrentSession, TorrentStatus,
};

/// Header carrying the CSRF token Transmission hands out with a 409.
const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Fields requested for the torrent list.
const TORRENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "percentDone",
    "totalSize",
    "sizeWhenDone",
    "leftUntilDone",
    "rateDownload",
    "rateUpload",
    "peersSendingToUs",
    "peersGettingFromUs",
    "uploadRatio",
    "uploadedEver",
    "downloadedEver",
    "error",
    "errorString",
    "addedDate",
    "downloadDir",
    "eta",
    "trackerStats",
];

/// Fields requested for a torrent's file list.
const FILE_FIELDS: &[&str] = &["id", "files", "fileStats"];

/// Tracker announce state meaning the tracker is not in use.
const TRACKER_INACTIVE: i64 = 0;

/// Transmission client implementation.
pub struct TransmissionSession {
    client: Client,
    config: SessionConfig,
    /// CSRF session id (refreshed on 409).
    session_id: Arc<RwLock<Option<String>>>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

impl TransmissionSession {
    /// Create a new Transmission session client.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SessionError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            session_id: Arc::new(RwLock::new(None)),
        })
    }

    fn request(&self, body: &RpcRequest<'_>, session_id: Option<&str>) -> RequestBuilder {
        let mut request = self.client.post(&self.config.url).json(body);
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }
        request
    }

    /// Execute one RPC call, renegotiating the session id once if needed.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        arguments: Value,
    ) -> Result<T, SessionError> {
        let body = RpcRequest { method, arguments };

        let mut attempt = 0;
        let response = loop {
            let session_id = self.session_id.read().await.clone();
            let response = self
                .request(&body, session_id.as_deref())
                .send()
                .await
                .map_err(map_transport_error)?;

            if response.status() == StatusCode::CONFLICT && attempt == 0 {
                let fresh = response
                    .headers()
                    .get(SESSION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                match fresh {
                    Some(id) => {
                        debug!("Transmission session id renegotiated");
                        *self.session_id.write().await = Some(id);
                        attempt += 1;
                        continue;
                    }
                    None => {
                        return Err(SessionError::ConnectionFailed(
                            "409 without session id header".to_string(),
                        ))
                    }
                }
            }
            break response;
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SessionError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SessionError::ConnectionFailed(format!("HTTP {}", status)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| SessionError::Decode(e.to_string()))?;
        if rpc.result != "success" {
            warn!("Transmission {} returned {}", method, rpc.result);
            return Err(SessionError::Rpc {
                method: method.to_string(),
                result: rpc.result,
            });
        }

        serde_json::from_value(rpc.arguments).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> SessionError {
    if e.is_timeout() {
        SessionError::Timeout
    } else if e.is_connect() {
        SessionError::ConnectionFailed(e.to_string())
    } else {
        SessionError::Internal(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TorrentGetArgs<T> {
    torrents: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTrackerStat {
    #[serde(default)]
    host: String,
    #[serde(default)]
    last_announce_succeeded: bool,
    #[serde(default)]
    announce_state: i64,
    #[serde(default)]
    last_announce_result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTorrent {
    id: i64,
    #[serde(default)]
    name: String,
    status: i64,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    size_when_done: i64,
    #[serde(default)]
    left_until_done: i64,
    #[serde(default)]
    rate_download: i64,
    #[serde(default)]
    rate_upload: i64,
    #[serde(default)]
    peers_sending_to_us: i64,
    #[serde(default)]
    peers_getting_from_us: i64,
    #[serde(default)]
    upload_ratio: f64,
    #[serde(default)]
    uploaded_ever: i64,
    #[serde(default)]
    downloaded_ever: i64,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    error_string: String,
    #[serde(default)]
    added_date: i64,
    #[serde(default)]
    download_dir: String,
    #[serde(default = "unknown_eta")]
    eta: i64,
    #[serde(default)]
    tracker_stats: Vec<TrTrackerStat>,
}

fn unknown_eta() -> i64 {
    -1
}

impl TrTorrent {
    fn into_record(self) -> TorrentRecord {
        let warning = tracker_warning(&self.tracker_stats);
        let trackers = tracker_names(&self.tracker_stats);
        let upload_ratio = if self.uploaded_ever == 0 && self.downloaded_ever == 0 {
            -1.0
        } else {
            self.upload_ratio
        };

        TorrentRecord {
            id: self.id,
            name: self.name,
            status: TorrentStatus::from(self.status),
            percent_done: self.percent_done,
            total_size: self.total_size.max(0) as u64,
            bytes_completed: (self.size_when_done - self.left_until_done).max(0) as u64,
            rate_download: self.rate_download.max(0) as u64,
            rate_upload: self.rate_upload.max(0) as u64,
            peers_sending_to_us: self.peers_sending_to_us.max(0) as u32,
            peers_getting_from_us: self.peers_getting_from_us.max(0) as u32,
            upload_ratio,
            error: self.error,
            error_string: self.error_string,
            warning,
            added_at: timestamp_to_datetime(self.added_date),
            download_dir: if self.download_dir.is_empty() {
                None
            } else {
                Some(self.download_dir)
            },
            trackers,
            eta_secs: if self.eta >= 0 {
                Some(self.eta as u64)
            } else {
                None
            },
        }
    }
}

/// A torrent is warned when every tracker in use failed its last announce.
fn tracker_warning(stats: &[TrTrackerStat]) -> String {
    if stats.is_empty() {
        return String::new();
    }

    let failures: Vec<&str> = stats
        .iter()
        .filter(|t| !t.last_announce_succeeded && t.announce_state != TRACKER_INACTIVE)
        .map(|t| t.last_announce_result.as_str())
        .collect();
    if failures.len() != stats.len() {
        return String::new();
    }

    let text = failures
        .iter()
        .filter(|r| !r.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(";");
    if text.is_empty() {
        "Tracker announce failed".to_string()
    } else {
        text
    }
}

/// Announce host without scheme, port or a leading `www.`/`tracker.` label.
fn tracker_name(host: &str) -> Option<String> {
    let host = host.split_once("://").map_or(host, |(_, rest)| rest);
    let host = host.split(['/', ':']).next().unwrap_or_default();

    let mut labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 1 && matches!(labels[0], "www" | "tracker") {
        labels.remove(0);
    }
    let name = labels.join(".");
    (!name.is_empty()).then_some(name)
}

fn tracker_names(stats: &[TrTrackerStat]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in stats.iter().filter_map(|t| tracker_name(&t.host)) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrFile {
    name: String,
    length: i64,
    #[serde(default)]
    bytes_completed: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrFileStat {
    #[serde(default)]
    bytes_completed: i64,
    #[serde(default = "default_wanted")]
    wanted: bool,
    #[serde(default)]
    priority: i64,
}

fn default_wanted() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrFileList {
    #[serde(default)]
    files: Vec<TrFile>,
    #[serde(default)]
    file_stats: Vec<TrFileStat>,
}

impl TrFileList {
    fn into_records(self) -> Vec<FileRecord> {
        let mut stats = self.file_stats.into_iter();
        self.files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                let (bytes_completed, wanted, priority) = match stats.next() {
                    Some(stat) => (stat.bytes_completed, stat.wanted, stat.priority),
                    None => (file.bytes_completed, true, 0),
                };
                FileRecord {
                    index,
                    name: file.name,
                    length: file.length.max(0) as u64,
                    bytes_completed: bytes_completed.max(0) as u64,
                    wanted,
                    priority: FilePriority::from(priority),
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrSessionStats {
    torrent_count: u64,
    active_torrent_count: u64,
    paused_torrent_count: u64,
    #[serde(default)]
    download_speed: u64,
    #[serde(default)]
    upload_speed: u64,
}

#[async_trait]
impl TorrentSession for TransmissionSession {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn fetch_torrents(&self) -> Result<Vec<TorrentRecord>, SessionError> {
        let args: TorrentGetArgs<TrTorrent> = self
            .call("torrent-get", json!({ "fields": TORRENT_FIELDS }))
            .await?;
        Ok(args.torrents.into_iter().map(TrTorrent::into_record).collect())
    }

    async fn fetch_files(&self, id: TorrentId) -> Result<Vec<FileRecord>, SessionError> {
        let args: TorrentGetArgs<TrFileList> = self
            .call(
                "torrent-get",
                json!({ "ids": [id], "fields": FILE_FIELDS }),
            )
            .await?;
        args.torrents
            .into_iter()
            .next()
            .map(TrFileList::into_records)
            .ok_or(SessionError::TorrentNotFound(id))
    }

    async fn session_stats(&self) -> Result<SessionStats, SessionError> {
        let stats: TrSessionStats = self.call("session-stats", json!({})).await?;
        Ok(SessionStats {
            torrent_count: stats.torrent_count,
            active_torrent_count: stats.active_torrent_count,
            paused_torrent_count: stats.paused_torrent_count,
            download_speed: stats.download_speed,
            upload_speed: stats.upload_speed,
        })
    }

    async fn set_file_priority(
        &self,
        id: TorrentId,
        indices: &[usize],
        priority: FilePriority,
    ) -> Result<(), SessionError> {
        let mut arguments = json!({ "ids": [id] });
        arguments[priority.rpc_argument()] = json!(indices);
        let _: Value = self.call("torrent-set", arguments).await?;
        Ok(())
    }

    async fn set_files_wanted(
        &self,
        id: TorrentId,
        indices: &[usize],
        wanted: bool,
    ) -> Result<(), SessionError> {
        let key = if wanted { "files-wanted" } else { "files-unwanted" };
        let mut arguments = json!({ "ids": [id] });
        arguments[key] = json!(indices);
        let _: Value = self.call("torrent-set", arguments).await?;
        Ok(())
    }
}
