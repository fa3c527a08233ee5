//! Carriage-return line framing for the MCU serial link
//!
//! The MCU terminates every sentence with `\r\n`. The framer accumulates
//! bytes one at a time, ignores `\n`, and yields the accumulated line when
//! `\r` arrives. Bytes beyond the configured maximum length are dropped so
//! an oversized or garbled sentence never grows the buffer without bound.

use bytes::BytesMut;
use tracing::trace;

use crate::config::MAX_LINE_LENGTH;

/// Accumulates bytes into carriage-return delimited sentences
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes of the line currently in flight
    buffer: BytesMut,
    /// Maximum number of bytes kept per line
    max_length: usize,
    /// Bytes dropped from the current line
    truncated: usize,
}

impl LineFramer {
    /// Create a framer with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a framer that keeps at most `max_length` bytes per line
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_length),
            max_length,
            truncated: 0,
        }
    }

    /// Feed one byte, returning the completed line on carriage return
    pub fn feed(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\n' => None,
            b'\r' => {
                let line = self.buffer.split();
                if self.truncated > 0 {
                    trace!(dropped = self.truncated, "Line exceeded maximum length");
                    self.truncated = 0;
                }
                Some(String::from_utf8_lossy(&line).into_owned())
            }
            _ => {
                if self.buffer.len() < self.max_length {
                    self.buffer.extend_from_slice(&[byte]);
                } else {
                    self.truncated += 1;
                }
                None
            }
        }
    }

    /// Number of bytes accumulated for the line in flight
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Maximum number of bytes kept per line
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Discard the line in flight
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.truncated = 0;
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
