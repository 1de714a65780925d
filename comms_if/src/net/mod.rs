//! # Network Module
//!
//! This module provides the networking abstractions shared by the rover and its clients. All
//! sockets are plain TCP carrying newline-delimited JSON, one value per line.
//!
//! Some clients write JSON objects back to back without a delimiter, so [`MsgFramer`] also splits
//! concatenated values that arrive on the same line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use crate::tc::TcParseError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters for the rover executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Address the telecommand server binds to, for example `"0.0.0.0:5000"`
    pub tc_endpoint: String,

    /// Address the telemetry server binds to
    pub tm_endpoint: String,

    /// If true a [`TcResponse`](crate::tc::TcResponse) line is sent back for every message
    pub send_responses: bool,

    /// Maximum number of bytes that may be buffered without forming a complete message. Anything
    /// longer is discarded.
    pub max_msg_len: usize,

    /// Read timeout on client connections. Bounds how long a connection thread takes to notice
    /// shutdown.
    ///
    /// Units: milliseconds
    pub recv_timeout_ms: u64,

    /// Write timeout on client connections. A client that stops reading its responses is
    /// disconnected once a write blocks for this long.
    ///
    /// Units: milliseconds
    pub send_timeout_ms: u64,
}

/// Splits a byte stream into JSON messages.
///
/// Bytes are pushed in as they are read from the socket and complete messages are popped out
/// with [`MsgFramer::next_msg`]. A message that cannot be parsed is discarded up to the end of
/// its line so that the following lines are still read.
#[derive(Debug)]
pub struct MsgFramer {
    buf: Vec<u8>,

    max_msg_len: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while sending a line to a peer.
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("Could not serialize the data: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not write to the socket: {0}")]
    IoError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            tc_endpoint: String::from("0.0.0.0:5000"),
            tm_endpoint: String::from("0.0.0.0:5001"),
            send_responses: true,
            max_msg_len: 1024,
            recv_timeout_ms: 200,
            send_timeout_ms: 500,
        }
    }
}

impl MsgFramer {
    pub fn new(max_msg_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_msg_len),
            max_msg_len,
        }
    }

    /// Append bytes read from the peer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet returned as a message.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete message.
    ///
    /// Returns `None` if the buffer doesn't hold a complete message yet. Errors are returned once
    /// per discarded message, after which the framer can continue to be used.
    pub fn next_msg(&mut self) -> Option<Result<Value, TcParseError>> {
        // Skip delimiters and any other leading whitespace
        let start = self
            .buf
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.buf.len());
        self.buf.drain(..start);

        if self.buf.is_empty() {
            return None;
        }

        let (result, offset) = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
            let result = stream.next();
            (result, stream.byte_offset())
        };

        match result {
            Some(Ok(val)) => {
                self.buf.drain(..offset);
                Some(Ok(val))
            }
            // Incomplete value, wait for more data unless the limit has been hit
            Some(Err(e)) if e.is_eof() => {
                if self.buf.len() > self.max_msg_len {
                    self.buf.clear();
                    Some(Err(TcParseError::TooLong(self.max_msg_len)))
                } else {
                    None
                }
            }
            Some(Err(e)) => {
                self.discard_line();
                Some(Err(TcParseError::InvalidJson(e)))
            }
            None => None,
        }
    }

    /// Discard everything up to and including the next newline.
    fn discard_line(&mut self) {
        match self.buf.iter().position(|&b| b == b'\n') {
            Some(i) => {
                self.buf.drain(..=i);
            }
            None => self.buf.clear(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Serialize `data` as JSON and write it to `writer` as a single line.
pub fn send_json_line<W, T>(writer: &mut W, data: &T) -> Result<(), SendError>
where
    W: Write,
    T: Serialize,
{
    let mut line = serde_json::to_vec(data).map_err(SendError::SerializationError)?;
    line.push(b'\n');

    writer.write_all(&line).map_err(SendError::IoError)?;
    writer.flush().map_err(SendError::IoError)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
