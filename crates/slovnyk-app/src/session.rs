//! Session coordinator -- one coordination thread, short-lived workers.
//!
//! Every network operation runs on its own worker thread against the shared
//! `Arc<DictionaryClient>`. Workers report back through one mpsc channel;
//! only the coordinator touches the store. Events carry the word they were
//! issued for, since workers finish in any order.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use slovnyk_client::{DictionaryClient, Router};
use slovnyk_format::{abbreviation_badges, format_definition};
use slovnyk_protocol::{Response, Status};
use slovnyk_storage::SessionStore;

/// Settings keys for the last endpoint that connected.
pub const LAST_HOST_KEY: &str = "last_host";
pub const LAST_PORT_KEY: &str = "last_port";

/// Shown when the server has no random word to offer.
pub const FALLBACK_WORD: &str = "Hello";
pub const FALLBACK_DEFINITION: &str = "Привіт! Вітання, формальне або неформальне.";

/// Raw result of one worker.
#[derive(Debug, Clone)]
pub enum Event {
    Connected { host: String, port: u16, ok: bool },
    Translated { word: String, response: String },
    Added { ukrainian: String, english: String, response: String },
    WordAdded { word: String, definition: String, response: String },
    Deleted { headword: String, response: String },
    Updated { headword: String, definition: String, response: String },
    Random { response: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    /// What the user asked for.
    pub query: String,
    pub headword: String,
    /// Definition as sent by the server.
    pub definition: String,
    pub formatted: String,
    pub favorite: bool,
    pub badges: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteResult {
    Done { detail: Option<String> },
    Duplicate { detail: Option<String> },
    Rejected { detail: Option<String> },
    NoResponse,
}

impl WriteResult {
    pub fn from_response(raw: &str) -> Self {
        match Response::parse(raw) {
            Response::Empty => WriteResult::NoResponse,
            Response::Status {
                status: Status::Success | Status::Added | Status::Yes,
                detail,
            } => WriteResult::Done { detail },
            Response::Status {
                status: Status::Exists,
                detail,
            } => WriteResult::Duplicate { detail },
            Response::Status { detail, .. }
                if detail
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains("already exists")) =>
            {
                WriteResult::Duplicate { detail }
            }
            Response::Status { detail, .. } => WriteResult::Rejected { detail },
            Response::NotFound => WriteResult::Rejected {
                detail: Some(slovnyk_protocol::NOT_FOUND.to_string()),
            },
            Response::Entry { .. } | Response::Text(_) => WriteResult::Rejected {
                detail: Some(raw.trim().to_string()),
            },
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, WriteResult::Done { .. })
    }
}

/// What the coordinator made of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Connected { host: String, port: u16 },
    ConnectFailed { host: String, port: u16 },
    Translation(Translation),
    NotFound { word: String },
    /// Every attempt failed; the connection is considered lost.
    NoResponse { verb: &'static str, word: String },
    Write {
        verb: &'static str,
        word: String,
        result: WriteResult,
    },
    WordOfDay {
        headword: String,
        formatted: String,
        fallback: bool,
    },
}

struct Worker {
    name: String,
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

pub struct Session {
    client: Arc<DictionaryClient>,
    store: SessionStore,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    workers: Vec<Worker>,
    join_timeout: Duration,
}

impl Session {
    pub fn new(client: Arc<DictionaryClient>, store: SessionStore, join_timeout: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            client,
            store,
            events_tx,
            events_rx,
            workers: Vec::new(),
            join_timeout,
        }
    }

    pub fn client(&self) -> &Arc<DictionaryClient> {
        &self.client
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Workers not yet reaped.
    pub fn pending(&self) -> usize {
        self.workers.len()
    }

    // ------------------------------------------------------------------
    // Worker launches
    // ------------------------------------------------------------------

    pub fn connect(&mut self) {
        self.spawn("connect", |client| {
            let ok = client.connect();
            let (host, port) = client.endpoint();
            Event::Connected { host, port, ok }
        });
    }

    /// Point the client somewhere else and connect there.
    pub fn connect_to(&mut self, host: &str, port: u16) {
        self.client.set_endpoint(host, port);
        self.connect();
    }

    /// Look up `word` (trimmed, lowercased). Blank input is ignored.
    pub fn translate(&mut self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return false;
        }
        self.spawn("translate", move |client| {
            let response = client.translate(&word);
            Event::Translated { word, response }
        });
        true
    }

    pub fn add(&mut self, ukrainian: &str, english: &str) -> bool {
        let (ukrainian, english) = (ukrainian.trim().to_string(), english.trim().to_string());
        if ukrainian.is_empty() || english.is_empty() {
            return false;
        }
        self.spawn("add", move |client| {
            let response = client.add(&ukrainian, &english);
            Event::Added {
                ukrainian,
                english,
                response,
            }
        });
        true
    }

    pub fn add_word(&mut self, word: &str, definition: &str) -> bool {
        let (word, definition) = (word.trim().to_string(), definition.trim().to_string());
        if word.is_empty() || definition.is_empty() {
            return false;
        }
        self.spawn("add_word", move |client| {
            let response = client.add_word(&word, &definition);
            Event::WordAdded {
                word,
                definition,
                response,
            }
        });
        true
    }

    pub fn delete(&mut self, headword: &str) -> bool {
        let headword = headword.trim().to_string();
        if headword.is_empty() {
            return false;
        }
        self.spawn("delete", move |client| {
            let response = client.delete_word(&headword);
            Event::Deleted { headword, response }
        });
        true
    }

    pub fn update(&mut self, headword: &str, definition: &str) -> bool {
        let (headword, definition) = (headword.trim().to_string(), definition.trim().to_string());
        if headword.is_empty() || definition.is_empty() {
            return false;
        }
        self.spawn("update", move |client| {
            let response = client.update_word(&headword, &definition);
            Event::Updated {
                headword,
                definition,
                response,
            }
        });
        true
    }

    pub fn random(&mut self) {
        self.spawn("random", |client| Event::Random {
            response: client.random_word(),
        });
    }

    fn spawn<F>(&mut self, name: &str, job: F)
    where
        F: FnOnce(&DictionaryClient) -> Event + Send + 'static,
    {
        self.reap();
        let client = Arc::clone(&self.client);
        let events = self.events_tx.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("slovnyk-{name}"))
            .spawn(move || {
                let event = job(&client);
                // The coordinator may already be gone during shutdown.
                let _ = events.send(event);
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                tracing::debug!(worker = name, "worker started");
                self.workers.push(Worker {
                    name: name.to_string(),
                    handle,
                    done: done_rx,
                });
            }
            Err(e) => tracing::error!(worker = name, error = %e, "failed to spawn worker"),
        }
    }

    /// Join workers that have already finished.
    fn reap(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .workers
            .drain(..)
            .partition(|w| w.handle.is_finished());
        self.workers = running;
        for worker in finished {
            if worker.handle.join().is_err() {
                tracing::warn!(worker = %worker.name, "worker panicked");
            }
        }
    }

    // ------------------------------------------------------------------
    // Coordination
    // ------------------------------------------------------------------

    /// Handle every event that has already arrived.
    pub fn poll(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => outcomes.push(self.handle(event)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.reap();
        outcomes
    }

    /// Wait up to `timeout` for the next event and handle it.
    pub fn next_outcome(&mut self, timeout: Duration) -> Option<Outcome> {
        let outcome = match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(self.handle(event)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        };
        self.reap();
        outcome
    }

    /// Block until every launched worker has reported, or `timeout` passes.
    pub fn drain(&mut self, timeout: Duration) -> Vec<Outcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.poll();
        while !self.workers.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(outcome) = self.next_outcome(deadline - now) {
                outcomes.push(outcome);
            }
        }
        outcomes.extend(self.poll());
        outcomes
    }

    pub fn handle(&mut self, event: Event) -> Outcome {
        match event {
            Event::Connected { host, port, ok } => self.on_connected(host, port, ok),
            Event::Translated { word, response } => self.on_translated(word, &response),
            Event::Added {
                ukrainian,
                english,
                response,
            } => {
                let result = WriteResult::from_response(&response);
                tracing::info!(ukrainian = %ukrainian, english = %english, ?result, "add finished");
                Outcome::Write {
                    verb: "ADD",
                    word: ukrainian,
                    result,
                }
            }
            Event::WordAdded {
                word,
                definition,
                response,
            } => {
                let result = WriteResult::from_response(&response);
                tracing::info!(word = %word, len = definition.len(), ?result, "add_word finished");
                Outcome::Write {
                    verb: "ADD_WORD",
                    word,
                    result,
                }
            }
            Event::Deleted { headword, response } => {
                let result = WriteResult::from_response(&response);
                if result.is_done() {
                    // The entry is gone server side; keep the local lists honest.
                    self.store.remove_history(&headword);
                    self.store.remove_favorite(&headword);
                }
                tracing::info!(headword = %headword, ?result, "delete finished");
                Outcome::Write {
                    verb: "DELETE",
                    word: headword,
                    result,
                }
            }
            Event::Updated {
                headword,
                definition,
                response,
            } => {
                let result = WriteResult::from_response(&response);
                if result.is_done() && self.store.is_favorite(&headword) {
                    self.store.remove_favorite(&headword);
                    self.store.add_favorite(&headword, &definition);
                }
                tracing::info!(headword = %headword, ?result, "update finished");
                Outcome::Write {
                    verb: "UPDATE",
                    word: headword,
                    result,
                }
            }
            Event::Random { response } => self.on_random(&response),
        }
    }

    fn on_connected(&mut self, host: String, port: u16, ok: bool) -> Outcome {
        if ok {
            self.store.set_setting(LAST_HOST_KEY, &host);
            self.store.set_setting(LAST_PORT_KEY, &port.to_string());
            Outcome::Connected { host, port }
        } else {
            Outcome::ConnectFailed { host, port }
        }
    }

    fn on_translated(&mut self, word: String, response: &str) -> Outcome {
        match Response::parse_lookup(response) {
            Response::Empty => {
                tracing::warn!(word = %word, "no response, connection lost");
                Outcome::NoResponse {
                    verb: "TRANSLATE",
                    word,
                }
            }
            Response::NotFound => {
                tracing::info!(word = %word, "not found");
                Outcome::NotFound { word }
            }
            Response::Entry {
                headword,
                definition,
            } => {
                if !definition.is_empty() {
                    self.store.add_history(&headword, &definition);
                }
                Outcome::Translation(self.translation(word, headword, definition))
            }
            Response::Status { .. } | Response::Text(_) => {
                let text = response.trim().to_string();
                tracing::warn!(word = %word, response = %text, "unexpected response format");
                self.store.add_history(&word, &text);
                let headword = word.clone();
                Outcome::Translation(self.translation(word, headword, text))
            }
        }
    }

    fn on_random(&mut self, response: &str) -> Outcome {
        match Response::parse_lookup(response) {
            Response::Entry {
                headword,
                definition,
            } => {
                let formatted = format_definition(&definition, Some(&headword));
                tracing::info!(headword = %headword, "word of the day");
                Outcome::WordOfDay {
                    headword,
                    formatted,
                    fallback: false,
                }
            }
            other => {
                tracing::debug!(response = ?other, "no random word, using fallback");
                Outcome::WordOfDay {
                    headword: FALLBACK_WORD.to_string(),
                    formatted: FALLBACK_DEFINITION.to_string(),
                    fallback: true,
                }
            }
        }
    }

    fn translation(&self, query: String, headword: String, definition: String) -> Translation {
        let formatted = format_definition(&definition, Some(&headword));
        let badges = abbreviation_badges(&formatted);
        let favorite = self.store.is_favorite(&headword);
        Translation {
            query,
            headword,
            definition,
            formatted,
            favorite,
            badges,
        }
    }

    /// Flip the favorite state of `word`. Returns the new state.
    pub fn toggle_favorite(&mut self, word: &str, definition: &str) -> bool {
        let word = word.trim();
        if self.store.is_favorite(word) {
            if !self.store.remove_favorite(word) && self.store.is_favorite(word) {
                tracing::warn!(word, "failed to remove favorite");
                return true;
            }
            tracing::info!(word, "removed from favorites");
            false
        } else {
            if !self.store.add_favorite(word, definition.trim()) && !self.store.is_favorite(word) {
                tracing::warn!(word, "failed to add favorite");
                return false;
            }
            tracing::info!(word, "added to favorites");
            true
        }
    }

    /// Give each worker a bounded time to finish, then close the client.
    /// Stragglers are detached; closing fails their pending request at once
    /// instead of waiting for the connection lock.
    pub fn shutdown(mut self) {
        let started = Instant::now();
        for worker in self.workers.drain(..) {
            match worker.done.recv_timeout(self.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        tracing::warn!(worker = %worker.name, "worker panicked");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        worker = %worker.name,
                        timeout_ms = self.join_timeout.as_millis() as u64,
                        "worker still running at shutdown, detaching"
                    );
                }
            }
        }
        self.client.close();
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "session closed");
    }
}
