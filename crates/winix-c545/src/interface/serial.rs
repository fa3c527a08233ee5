//! Serial port transport for the C545 MCU
//!
//! Wraps a blocking `serialport` handle. Reads are only issued for bytes
//! the driver reports as already buffered, so the engine tick never waits
//! on the wire.

use serialport::SerialPort;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::config::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use crate::error::{Result, WinixError};
use crate::interface::Transport;

/// Serial transport for the MCU link
pub struct SerialTransport {
    /// Serial port path
    port_path: PathBuf,

    /// Baud rate
    baud_rate: u32,

    /// Read/write timeout
    timeout: Duration,

    /// Open port handle
    port: Option<Box<dyn SerialPort>>,

    /// Transport name for logging
    name: String,
}

impl SerialTransport {
    /// Create a closed transport for `port`
    pub fn new(port: impl AsRef<Path>) -> Self {
        let port_path = port.as_ref().to_path_buf();
        let name = format!("serial:{}", port_path.display());

        Self {
            port_path,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            port: None,
            name,
        }
    }

    /// Create from serial configuration
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(&config.port)
            .with_baud_rate(config.baud_rate)
            .with_timeout(config.timeout)
    }

    /// Create with custom baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Create with custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the port path
    pub fn port_path(&self) -> &Path {
        &self.port_path
    }

    /// Whether the port is open
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Open the serial port
    pub fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        info!(port = %self.port_path.display(), baud = self.baud_rate, "Opening serial port");

        if !self.port_path.exists() {
            return Err(WinixError::PortNotFound(
                self.port_path.display().to_string(),
            ));
        }

        let port = serialport::new(self.port_path.to_string_lossy(), self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| match WinixError::from(e) {
                WinixError::PortOpenFailed { reason, .. } => WinixError::PortOpenFailed {
                    port: self.port_path.display().to_string(),
                    reason,
                },
                other => other,
            })?;

        self.port = Some(port);
        info!(port = %self.port_path.display(), "Serial port open");
        Ok(())
    }

    /// Close the serial port
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.port_path.display(), "Serial port closed");
        }
    }
}

impl Transport for SerialTransport {
    fn available(&mut self) -> usize {
        let Some(port) = self.port.as_mut() else {
            return 0;
        };
        match port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                error!(error = %e, "Failed to query serial buffer");
                0
            }
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let port = self.port.as_mut().ok_or(WinixError::Disconnected)?;

        let mut buf = [0u8; 1];
        port.read_exact(&mut buf).map_err(|e| {
            error!(error = %e, "Serial read error");
            WinixError::ReadError(e.to_string())
        })?;

        trace!(byte = buf[0], "Read from serial port");
        Ok(buf[0])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(WinixError::Disconnected)?;

        debug!(size = bytes.len(), "Writing to serial port");
        port.write_all(bytes).map_err(|e| {
            error!(error = %e, "Serial write error");
            WinixError::WriteError(e.to_string())
        })?;

        port.flush()
            .map_err(|e| WinixError::WriteError(format!("Flush failed: {}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port_path)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}
