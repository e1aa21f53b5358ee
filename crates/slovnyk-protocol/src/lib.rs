//! Slovnyk Protocol -- wire commands, tagged responses, line codec.
//!
//! Plain TCP to the dictionary server. One newline-terminated UTF-8 command
//! per request, `|`-delimited fields, no escaping. Responses carry no length
//! prefix: a frame ends when the server closes or a read comes back short.

pub mod codec;
pub mod messages;

pub use codec::{LineCodec, ResponseDecoder};
pub use messages::*;

/// Default server address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Field separator inside commands and `headword|definition` responses.
pub const FIELD_SEPARATOR: char = '|';

/// Command terminator.
pub const LINE_TERMINATOR: char = '\n';

/// Sentinel the server returns for unknown words.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Read buffer size. A read shorter than this marks the end of a response.
pub const DEFAULT_RECV_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid field `{field}` in {verb}: {reason}")]
    InvalidField {
        verb: &'static str,
        field: &'static str,
        reason: &'static str,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
