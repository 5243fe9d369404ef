use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote Transmission session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// RPC endpoint (e.g., "http://localhost:9091/transmission/rpc")
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:9091/transmission/rpc".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Polling and list presentation settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Re-fetch torrent state on a fixed interval.
    #[serde(default = "default_auto_reload")]
    pub auto_reload: bool,

    /// Interval between fetch cycles (milliseconds).
    #[serde(default = "default_reload_interval")]
    pub reload_interval_ms: u64,

    /// Rows per list page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_auto_reload() -> bool {
    true
}

fn default_reload_interval() -> u64 {
    5000 // 5 seconds
}

fn default_page_size() -> usize {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_reload: default_auto_reload(),
            reload_interval_ms: default_reload_interval(),
            page_size: default_page_size(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub session: SanitizedSessionConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
}

/// Sanitized session config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSessionConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            session: SanitizedSessionConfig {
                url: config.session.url.clone(),
                username: config.session.username.clone(),
                password_configured: config
                    .session
                    .password
                    .as_ref()
                    .is_some_and(|p| !p.is_empty()),
                timeout_secs: config.session.timeout_secs,
            },
            sync: config.sync.clone(),
            server: config.server.clone(),
        }
    }
}
