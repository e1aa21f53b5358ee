//! Line codec for commands and best-effort UTF-8 framing for responses.
//!
//! Commands: UTF-8 text + `\n`.
//! Responses: no delimiter. A frame is complete when the accumulated bytes
//! decode cleanly *and* the last read was shorter than the read buffer. A
//! reply whose length is an exact multiple of the buffer therefore only ends
//! at the read deadline or on remote close.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::Command;
use crate::{ProtocolError, DEFAULT_RECV_CHUNK, LINE_TERMINATOR};

/// Encodes raw command text or a [`Command`] as one terminated line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCodec;

impl<'a> Encoder<&'a str> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: &'a str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        if !item.ends_with(LINE_TERMINATOR) {
            dst.put_u8(b'\n');
        }
        Ok(())
    }
}

impl Encoder<&Command> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: &Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&str>::encode(self, item.to_wire().as_str(), dst)
    }
}

/// Accumulates response chunks until they form a complete frame.
///
/// The caller feeds every read into the buffer and reports its length with
/// [`ResponseDecoder::record_chunk`] before calling `decode`.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    chunk_size: usize,
    last_chunk: usize,
}

impl ResponseDecoder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            last_chunk: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.last_chunk = len;
    }

    fn last_read_was_short(&self) -> bool {
        self.last_chunk < self.chunk_size
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_RECV_CHUNK)
    }
}

impl Decoder for ResponseDecoder {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let text = match std::str::from_utf8(&src[..]) {
            Ok(text) => text,
            Err(e) => {
                // Most often a multi-byte character cut at the read boundary.
                tracing::trace!(
                    buffered = src.len(),
                    valid_up_to = e.valid_up_to(),
                    "incomplete utf-8 frame, waiting for more data"
                );
                return Ok(None);
            }
        };

        if !self.last_read_was_short() {
            return Ok(None);
        }

        let frame = text.trim().to_string();
        src.clear();
        Ok(Some(frame))
    }

    /// Whatever is buffered when the stream ends, decoded tolerantly.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let frame = String::from_utf8_lossy(src).trim().to_string();
        src.clear();
        Ok(Some(frame))
    }
}
