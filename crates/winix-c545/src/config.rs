//! Configuration types for the Winix C545 bridge
//!
//! This module provides the protocol constants shared by every component
//! and the configuration structures for the serial link and the engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WinixError};

/// Prefix of every sentence received from the MCU
pub const RX_PREFIX: &str = "AT*ICT*";

/// Prefix of every sentence written to the MCU
pub const TX_PREFIX: &str = "*ICT*";

/// Terminator appended to every outgoing sentence
pub const TX_TERMINATOR: &str = "\r\n";

/// Maximum length of a framed sentence
pub const MAX_LINE_LENGTH: usize = 255;

/// Default baud rate of the C545 MCU link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default serial read timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Inactivity window before the handshake re-announces the device
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between engine ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Version of the OEM WiFi module reported in the MIB reply
pub const OEM_MODULE_VERSION: u16 = 7595;

/// Main configuration for the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WinixConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Protocol engine settings
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Serial port settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Path to serial port (e.g., /dev/ttyUSB0, COM3)
    pub port: PathBuf,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Read timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MS)
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: default_timeout(),
        }
    }
}

/// Protocol engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Inactivity window for `DEVICEREADY` announcements
    #[serde(with = "humantime_serde", default = "default_handshake_timeout")]
    pub handshake_timeout: Duration,

    /// Maximum accepted sentence length; longer input is truncated
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Interval between engine ticks
    #[serde(with = "humantime_serde", default = "default_tick_interval")]
    pub tick_interval: Duration,
}

fn default_handshake_timeout() -> Duration {
    DEFAULT_HANDSHAKE_TIMEOUT
}

fn default_max_line_length() -> usize {
    MAX_LINE_LENGTH
}

fn default_tick_interval() -> Duration {
    DEFAULT_TICK_INTERVAL
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_line_length: MAX_LINE_LENGTH,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl WinixConfig {
    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(WinixError::InvalidConfig(
                "baud_rate must be non-zero".to_string(),
            ));
        }
        if self.protocol.max_line_length == 0 || self.protocol.max_line_length > MAX_LINE_LENGTH {
            return Err(WinixError::InvalidConfig(format!(
                "max_line_length must be within 1..={}",
                MAX_LINE_LENGTH
            )));
        }
        if self.protocol.handshake_timeout.is_zero() {
            return Err(WinixError::InvalidConfig(
                "handshake_timeout must be non-zero".to_string(),
            ));
        }
        if self.protocol.tick_interval.is_zero() {
            return Err(WinixError::InvalidConfig(
                "tick_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for WinixConfig
#[derive(Debug, Default)]
pub struct WinixConfigBuilder {
    config: WinixConfig,
}

impl WinixConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: WinixConfig) -> Self {
        Self { config }
    }

    /// Set serial port path
    pub fn serial_port(mut self, port: impl Into<PathBuf>) -> Self {
        self.config.serial.port = port.into();
        self
    }

    /// Set baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.serial.baud_rate = baud_rate;
        self
    }

    /// Set the handshake inactivity window
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.protocol.handshake_timeout = timeout;
        self
    }

    /// Set the maximum sentence length, clamped to [`MAX_LINE_LENGTH`]
    pub fn max_line_length(mut self, length: usize) -> Self {
        self.config.protocol.max_line_length = length.min(MAX_LINE_LENGTH);
        self
    }

    /// Set the tick interval
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.protocol.tick_interval = interval;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WinixConfig {
        self.config
    }
}

// Custom serde module for Duration with humantime
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
