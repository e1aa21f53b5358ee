//! Loopback stand-in for the dictionary server.
//!
//! Each accepted connection gets its own thread that reads one command line
//! at a time and writes back whatever the reply function returns. A `None`
//! reply means "stay silent".

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use slovnyk_app::config::AppConfig;
use slovnyk_app::session::{Outcome, Session};

type ReplyFn = dyn Fn(&str) -> Option<String> + Send + Sync;

pub struct FakeServer {
    pub port: u16,
    received: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl FakeServer {
    pub fn start(reply: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let reply: Arc<ReplyFn> = Arc::new(reply);

        let log = Arc::clone(&received);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let reply = Arc::clone(&reply);
                let log = Arc::clone(&log);
                thread::spawn(move || serve(stream, reply.as_ref(), &log));
            }
        });

        Self { port, received }
    }

    /// A server that answers like the real one for a tiny word list.
    pub fn dictionary() -> Self {
        Self::start(|line| {
            let mut fields = line.splitn(3, '|');
            let verb = fields.next().unwrap_or_default();
            let key = fields.next().unwrap_or_default();
            let reply = match (verb, key) {
                ("TRANSLATE", "cat") => "cat|n кіт; розм. кицька".to_string(),
                ("TRANSLATE", "chicken") => {
                    "chicken|1. noun a domestic bird~ 2. verb to chicken out".to_string()
                }
                ("TRANSLATE", "error") => "error|n помилка".to_string(),
                ("TRANSLATE", _) => "NOT_FOUND".to_string(),
                ("ADD" | "ADD_WORD", "cat") => "Error|Word already exists".to_string(),
                ("ADD" | "ADD_WORD", _) => "Success|Word added".to_string(),
                ("DELETE", "cat") => "Success|Word deleted.".to_string(),
                ("DELETE", _) => "Error|Word not found.".to_string(),
                ("UPDATE", _) => "Success|Word updated.".to_string(),
                ("GET_RANDOM", _) => "chicken|noun a domestic bird".to_string(),
                _ => "UNKNOWN_COMMAND".to_string(),
            };
            Some(reply)
        })
    }

    /// Command lines received so far, without terminators.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

fn serve(stream: TcpStream, reply: &ReplyFn, log: &Mutex<Vec<String>>) {
    let mut writer = stream.try_clone().unwrap();
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        log.lock().unwrap().push(line.clone());
        // No reply keeps the socket open without answering.
        if let Some(text) = reply(&line) {
            if writer.write_all(text.as_bytes()).is_err() {
                break;
            }
        }
    }
}

/// Defaults tuned for loopback: short timeouts, near-zero backoff.
pub fn test_config(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.database = dir.path().join("history.db").display().to_string();
    config.server.timeout_ms = 300;
    config.client.base_backoff_ms = 10;
    config.client.max_backoff_ms = 20;
    config.session.join_timeout_ms = 100;
    config
}

/// Enough for three timed-out attempts plus backoff.
pub const WAIT: Duration = Duration::from_secs(3);

/// Drain and expect exactly one outcome.
pub fn one(session: &mut Session) -> Outcome {
    let mut outcomes = session.drain(WAIT);
    assert_eq!(outcomes.len(), 1, "expected one outcome, got {outcomes:?}");
    outcomes.remove(0)
}
