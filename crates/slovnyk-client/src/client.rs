//! DictionaryClient -- connection ownership, retry loop, response framing.
//!
//! The socket handle lives inside a `Mutex<Connection>` and is touched only
//! while that lock is held. Retry sleeps happen outside the lock so other
//! callers are not stalled by backoff. A cloned handle kept outside that
//! lock lets [`DictionaryClient::close`] shut the socket down under a
//! request that is still receiving.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use slovnyk_protocol::{LineCodec, ResponseDecoder, FIELD_SEPARATOR};

use crate::state::{Exchange, ExchangeState};
use crate::{ClientConfig, Transport};

/// Smallest timeout handed to the socket layer; zero is rejected there.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

struct Connection {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

/// Result of one send+receive attempt.
enum Attempt {
    /// Clean frame: decoded and ended by a short read.
    Complete(String),
    /// Bytes arrived but the frame never completed; decoded lossily.
    Partial { text: String, connection_lost: bool },
    /// Nothing usable. The connection is dropped and the request retried.
    Lost(String),
}

/// Saves the socket timeouts, applies the request timeout, and puts the
/// saved values back when dropped.
struct TimeoutGuard<'a> {
    stream: &'a TcpStream,
    read: Option<Duration>,
    write: Option<Duration>,
}

impl<'a> TimeoutGuard<'a> {
    fn apply(stream: &'a TcpStream, timeout: Duration) -> io::Result<Self> {
        let read = stream.read_timeout()?;
        let write = stream.write_timeout()?;
        let guard = Self {
            stream,
            read,
            write,
        };
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(guard)
    }
}

impl Drop for TimeoutGuard<'_> {
    fn drop(&mut self) {
        let _ = self.stream.set_read_timeout(self.read);
        let _ = self.stream.set_write_timeout(self.write);
    }
}

/// Client for the dictionary server. Share it as `Arc<DictionaryClient>`.
pub struct DictionaryClient {
    config: ClientConfig,
    conn: Mutex<Connection>,
    /// Clone of the live socket, only ever used to shut it down.
    closer: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl DictionaryClient {
    pub fn new(config: ClientConfig) -> Self {
        let conn = Connection {
            host: config.host.clone(),
            port: config.port,
            stream: None,
        };
        Self {
            config,
            conn: Mutex::new(conn),
            closer: Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Lock-free view of the connected flag; safe to poll from the
    /// coordination thread while a worker owns the socket.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn endpoint(&self) -> (String, u16) {
        let conn = self.lock();
        (conn.host.clone(), conn.port)
    }

    /// Change the server address. Takes effect on the next connect.
    pub fn set_endpoint(&self, host: impl Into<String>, port: u16) {
        let mut conn = self.lock();
        conn.host = host.into();
        conn.port = port;
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Open a fresh connection, closing any existing one first.
    pub fn connect(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut conn = self.lock();
        self.connect_locked(&mut conn)
    }

    /// Shut down and close the socket. Always succeeds.
    pub fn disconnect(&self) {
        let mut conn = self.lock();
        if let Some(stream) = conn.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(error = %e, "shutdown on disconnect failed");
            }
            drop(stream);
        }
        self.closer_lock().take();
        self.connected.store(false, Ordering::Release);
        tracing::info!(host = %conn.host, port = conn.port, "disconnected from server");
    }

    /// Shut the client down for good without waiting for a request in
    /// flight. A request blocked on the socket fails at once and is not
    /// retried; later calls return `""` / `false` straight away.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        if let Some(stream) = self.closer_lock().take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(error = %e, "shutdown on close failed");
            }
        }
        match self.conn.try_lock() {
            Ok(mut conn) => {
                conn.stream.take();
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().stream.take();
            }
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("request in flight, its owner drops the socket");
            }
        }
        tracing::info!("client closed");
    }

    /// Send one command and return the trimmed reply.
    ///
    /// Retries with exponential backoff, reconnecting as needed. Returns an
    /// empty string when every attempt failed.
    pub fn send_command(&self, command: &str) -> String {
        let mut line = BytesMut::new();
        if let Err(e) = Encoder::<&str>::encode(&mut LineCodec, command, &mut line) {
            tracing::error!(error = %e, "failed to encode command");
            return String::new();
        }
        let verb = command
            .split(FIELD_SEPARATOR)
            .next()
            .unwrap_or_default()
            .trim();
        let mut exchange = Exchange::new(verb);

        for attempt in 1..=self.config.max_attempts.max(1) {
            if self.is_closed() {
                tracing::debug!(verb, attempt, "client closed, abandoning request");
                return String::new();
            }
            if attempt > 1 {
                let delay = self.config.backoff(attempt - 1);
                tracing::info!(
                    verb,
                    attempt,
                    max_attempts = self.config.max_attempts,
                    backoff_ms = delay.as_millis() as u64,
                    "retrying request"
                );
                thread::sleep(delay);
            }
            exchange.begin_attempt(attempt);

            let mut conn = self.lock();
            if self.is_closed() {
                tracing::debug!(verb, attempt, "client closed, abandoning request");
                return String::new();
            }
            if conn.stream.is_none() {
                exchange.advance(ExchangeState::Connecting);
                if !self.connect_locked(&mut conn) {
                    exchange.advance(ExchangeState::Failed);
                    continue;
                }
            }
            let Some(stream) = conn.stream.as_ref() else {
                exchange.advance(ExchangeState::Failed);
                continue;
            };

            match self.attempt(stream, &line, &mut exchange) {
                Attempt::Complete(text) => {
                    exchange.advance(ExchangeState::Done);
                    return text;
                }
                Attempt::Partial {
                    text,
                    connection_lost,
                } => {
                    tracing::debug!(verb, bytes = text.len(), "returning partial response");
                    if connection_lost {
                        self.drop_connection(&mut conn);
                    }
                    exchange.advance(ExchangeState::Done);
                    return text;
                }
                Attempt::Lost(reason) => {
                    tracing::warn!(verb, attempt, %reason, "connection lost, will reconnect");
                    self.drop_connection(&mut conn);
                    exchange.advance(ExchangeState::Failed);
                }
            }
        }

        tracing::error!(
            verb,
            attempts = self.config.max_attempts,
            "request failed after all attempts"
        );
        String::new()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves at worst a dead socket,
        // which the next attempt replaces.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closer_lock(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.closer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timeout(&self) -> Duration {
        self.config.timeout.max(MIN_TIMEOUT)
    }

    fn drop_connection(&self, conn: &mut Connection) {
        if let Some(stream) = conn.stream.take() {
            drop(stream);
        }
        self.closer_lock().take();
        self.connected.store(false, Ordering::Release);
    }

    fn connect_locked(&self, conn: &mut Connection) -> bool {
        self.drop_connection(conn);

        let addrs: Vec<SocketAddr> = match (conn.host.as_str(), conn.port).to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                tracing::error!(host = %conn.host, port = conn.port, error = %e, "failed to resolve server address");
                return false;
            }
        };

        let timeout = self.timeout();
        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    if let Err(e) = stream
                        .set_read_timeout(Some(timeout))
                        .and_then(|_| stream.set_write_timeout(Some(timeout)))
                    {
                        tracing::warn!(%addr, error = %e, "failed to apply socket timeouts");
                        last_error = Some(e);
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    match stream.try_clone() {
                        Ok(handle) => *self.closer_lock() = Some(handle),
                        Err(e) => tracing::warn!(%addr, error = %e, "failed to clone socket handle"),
                    }
                    if self.is_closed() {
                        self.closer_lock().take();
                        return false;
                    }
                    conn.stream = Some(stream);
                    self.connected.store(true, Ordering::Release);
                    tracing::info!(host = %conn.host, port = conn.port, %addr, "connected to server");
                    return true;
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                tracing::error!(host = %conn.host, port = conn.port, error = %e, "failed to connect")
            }
            None => {
                tracing::error!(host = %conn.host, port = conn.port, "server address resolved to nothing")
            }
        }
        false
    }

    fn attempt(&self, stream: &TcpStream, line: &[u8], exchange: &mut Exchange) -> Attempt {
        let timeout = self.timeout();
        let _timeouts = match TimeoutGuard::apply(stream, timeout) {
            Ok(guard) => guard,
            Err(e) => return Attempt::Lost(format!("failed to apply timeout: {e}")),
        };

        exchange.advance(ExchangeState::Sending);
        let mut writer = stream;
        if let Err(e) = writer.write_all(line).and_then(|_| writer.flush()) {
            return Attempt::Lost(format!("send failed: {e}"));
        }
        tracing::debug!(bytes = line.len(), "command sent");

        exchange.advance(ExchangeState::Receiving);
        let mut decoder = ResponseDecoder::new(self.config.recv_chunk);
        let mut chunk = vec![0u8; decoder.chunk_size()];
        let mut buf = BytesMut::with_capacity(decoder.chunk_size());
        let mut received = 0usize;
        let mut connection_lost = false;
        let mut reader = stream;
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(received, "receive deadline reached");
                break;
            }
            if let Err(e) = stream.set_read_timeout(Some((deadline - now).max(MIN_TIMEOUT))) {
                tracing::warn!(error = %e, "failed to arm read timeout");
                connection_lost = true;
                break;
            }

            match reader.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!(received, "server closed the connection");
                    connection_lost = true;
                    break;
                }
                Ok(n) => {
                    received += n;
                    buf.extend_from_slice(&chunk[..n]);
                    decoder.record_chunk(n);
                    match decoder.decode(&mut buf) {
                        Ok(Some(text)) => {
                            tracing::debug!(received, "response received");
                            return Attempt::Complete(text);
                        }
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::warn!(error = %e, "response decoding failed");
                            break;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    tracing::warn!(received, "receive timed out");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, received, "receive failed");
                    connection_lost = true;
                    break;
                }
            }
        }

        match decoder.decode_eof(&mut buf) {
            Ok(Some(text)) => Attempt::Partial {
                text,
                connection_lost,
            },
            Ok(None) => Attempt::Lost("empty response".into()),
            Err(e) => Attempt::Lost(format!("response decoding failed: {e}")),
        }
    }
}

impl Transport for DictionaryClient {
    fn send_command(&self, command: &str) -> String {
        DictionaryClient::send_command(self, command)
    }
}

impl std::fmt::Debug for DictionaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (host, port) = self.endpoint();
        f.debug_struct("DictionaryClient")
            .field("host", &host)
            .field("port", &port)
            .field("connected", &self.is_connected())
            .finish()
    }
}
