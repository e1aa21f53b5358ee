//! Slovnyk Client -- one socket to the dictionary server.
//!
//! Blocking I/O, meant to be driven from worker threads. All socket access
//! goes through a single lock, so concurrent callers are safe but strictly
//! serialised: there is never more than one request in flight.

pub mod client;
pub mod router;
pub mod state;

pub use client::DictionaryClient;
pub use router::Router;
pub use state::ExchangeState;

use serde::{Deserialize, Serialize};
use slovnyk_protocol::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RECV_CHUNK};
use std::time::Duration;

/// Attempts per request, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// First retry delay; doubles on every further retry.
pub const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound for the retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Connect, send and receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Anything that can carry one command line and hand back the raw reply.
///
/// An empty string means no reply at all.
pub trait Transport: Send + Sync {
    fn send_command(&self, command: &str) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub recv_chunk: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
            max_backoff: MAX_BACKOFF,
            recv_chunk: DEFAULT_RECV_CHUNK,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2*base, 4*base, ...
    /// capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.recv_chunk, 4096);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.backoff(1), Duration::from_millis(500));
        assert_eq!(cfg.backoff(2), Duration::from_secs(1));
        assert_eq!(cfg.backoff(3), Duration::from_secs(2));
        assert_eq!(cfg.backoff(5), Duration::from_secs(8));
        assert_eq!(cfg.backoff(6), Duration::from_secs(8));
        assert_eq!(cfg.backoff(40), Duration::from_secs(8));
    }

    proptest::proptest! {
        #[test]
        fn prop_backoff_never_shrinks_or_exceeds_cap(retry in 1u32..64) {
            let cfg = ClientConfig::default();
            proptest::prop_assert!(cfg.backoff(retry) <= cfg.max_backoff);
            proptest::prop_assert!(cfg.backoff(retry + 1) >= cfg.backoff(retry));
        }
    }
}
