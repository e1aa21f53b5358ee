//! Configuration types for slovnyk.
//! Parsed from ~/.slovnyk/config.toml.

use serde::{Deserialize, Serialize};
use slovnyk_client::ClientConfig;
use slovnyk_protocol::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RECV_CHUNK};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Unset host/port fall back to the last endpoint that worked, then to the
/// built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_recv_chunk")]
    pub recv_chunk: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_tag_color")]
    pub tag_color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Also append log lines to this file.
    pub file: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            recv_chunk: default_recv_chunk(),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database: default_database(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            tag_color: default_tag_color(),
        }
    }
}

// Default value functions
fn default_timeout_ms() -> u64 {
    2000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8000
}
fn default_recv_chunk() -> usize {
    DEFAULT_RECV_CHUNK
}
fn default_database() -> String {
    "~/.slovnyk/history.db".into()
}
fn default_history_limit() -> usize {
    slovnyk_storage::HISTORY_LIMIT
}
fn default_join_timeout_ms() -> u64 {
    500
}
fn default_tag_color() -> String {
    slovnyk_format::DEFAULT_TAG_COLOR.into()
}

impl AppConfig {
    /// Load config from file, or use defaults if missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Endpoint to use: pinned config first, then `remembered`, then defaults.
    pub fn endpoint(&self, remembered: Option<(String, u16)>) -> (String, u16) {
        let (last_host, last_port) = match remembered {
            Some((host, port)) => (Some(host), Some(port)),
            None => (None, None),
        };
        let host = self
            .server
            .host
            .clone()
            .or(last_host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = self.server.port.or(last_port).unwrap_or(DEFAULT_PORT);
        (host, port)
    }

    pub fn client_config(&self, host: String, port: u16) -> ClientConfig {
        ClientConfig {
            host,
            port,
            timeout: Duration::from_millis(self.server.timeout_ms),
            max_attempts: self.client.max_attempts.max(1),
            base_backoff: Duration::from_millis(self.client.base_backoff_ms),
            max_backoff: Duration::from_millis(self.client.max_backoff_ms),
            recv_chunk: self.client.recv_chunk.max(1),
        }
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.session.join_timeout_ms)
    }
}
