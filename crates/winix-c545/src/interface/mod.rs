//! Byte transports for the MCU link
//!
//! - [`SerialTransport`] - Serial port communication (requires `serial` feature)
//! - [`crate::test_utils::MockTransport`] - In-memory transport for tests
//!
//! The engine polls the transport from its tick: it checks how many bytes
//! are waiting, reads them one at a time, and writes whole sentences. None
//! of these calls may block for longer than a byte time.

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

use crate::error::Result;

/// Non-blocking byte transport to the MCU
pub trait Transport {
    /// Number of bytes that can be read without blocking
    fn available(&mut self) -> usize;

    /// Read one byte
    fn read_byte(&mut self) -> Result<u8>;

    /// Write all bytes
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Transport name (for logging)
    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
