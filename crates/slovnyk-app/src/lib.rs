//! Slovnyk App -- library side of the terminal client.
//!
//! Wires config, store, client and the session coordinator together so the
//! binary and the integration tests build sessions the same way.

pub mod config;
pub mod session;
pub mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use slovnyk_client::DictionaryClient;
use slovnyk_storage::SessionStore;

use crate::config::AppConfig;
use crate::session::{Session, LAST_HOST_KEY, LAST_PORT_KEY};

/// Endpoint remembered from the last successful connect, if both halves are
/// present and the port parses.
pub fn remembered_endpoint(store: &SessionStore) -> Option<(String, u16)> {
    let host = store.get_setting(LAST_HOST_KEY, "");
    let port = store.get_setting(LAST_PORT_KEY, "");
    if host.is_empty() {
        return None;
    }
    port.parse().ok().map(|port| (host, port))
}

/// Open the store named by `config` and build a session around it.
/// `host`/`port` override whatever config and the store say.
pub fn open_session(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<Session> {
    let db_path = expand_tilde(&config.storage.database);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SessionStore::open(&db_path, config.storage.history_limit)?;

    let (default_host, default_port) = config.endpoint(remembered_endpoint(&store));
    let host = host.unwrap_or(default_host);
    let port = port.unwrap_or(default_port);
    tracing::info!(db = %db_path.display(), host = %host, port, "session opened");

    let client = Arc::new(DictionaryClient::new(config.client_config(host, port)));
    Ok(Session::new(client, store, config.join_timeout()))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs_or_home() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn dirs_or_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
