//! Error types for Winix C545 bridge operations
//!
//! Protocol errors describe malformed or unexpected traffic from the MCU.
//! None of them are fatal: the engine logs the error, drops the sentence
//! and goes back to waiting for the next one. Transport and configuration
//! errors surface to the host runtime.

use thiserror::Error;

/// Main error type for Winix bridge operations
#[derive(Error, Debug)]
pub enum WinixError {
    // ===== Serial/Transport Errors =====
    /// Serial port not found
    #[error("Serial port not found: {0}")]
    PortNotFound(String),

    /// Serial port open failed
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpenFailed {
        /// Port path
        port: String,
        /// Failure reason
        reason: String,
    },

    /// Serial read error
    #[error("Serial read error: {0}")]
    ReadError(String),

    /// Serial write error
    #[error("Serial write error: {0}")]
    WriteError(String),

    /// Transport is not open
    #[error("Transport disconnected")]
    Disconnected,

    // ===== Protocol Errors =====
    /// Sentence does not start with the receive prefix
    #[error("Invalid sentence prefix: {0}")]
    InvalidPrefix(String),

    /// Sentence category is not handled
    #[error("Unsupported sentence: {0}")]
    UnsupportedSentence(String),

    /// API code could not be extracted from an AWS sentence
    #[error("Failed to extract API code from: {0}")]
    InvalidApiCode(String),

    /// API code is well formed but not known
    #[error("Unknown API code {code}: {sentence}")]
    UnknownApiCode {
        /// Numeric API code
        code: u16,
        /// Sentence that carried it
        sentence: String,
    },

    /// Key-value token does not match `"KEY":"VALUE"`
    #[error("Invalid key-value token: {0}")]
    InvalidToken(String),

    /// State key is empty, too long, or not alphanumeric
    #[error("Invalid state key: {0:?}")]
    InvalidKey(String),

    // ===== Control Errors =====
    /// Control request cannot be expressed on the wire
    #[error("Invalid control request: {0}")]
    InvalidControl(String),

    // ===== Configuration Errors =====
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WinixError {
    /// Check if this is a protocol error (bad data from the MCU)
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            WinixError::InvalidPrefix(_)
                | WinixError::UnsupportedSentence(_)
                | WinixError::InvalidApiCode(_)
                | WinixError::UnknownApiCode { .. }
                | WinixError::InvalidToken(_)
                | WinixError::InvalidKey(_)
        )
    }

    /// Check if this error came from the transport
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            WinixError::PortNotFound(_)
                | WinixError::PortOpenFailed { .. }
                | WinixError::ReadError(_)
                | WinixError::WriteError(_)
                | WinixError::Disconnected
                | WinixError::Io(_)
        )
    }

    /// Get an error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            WinixError::PortNotFound(_) => "PORT_NOT_FOUND",
            WinixError::PortOpenFailed { .. } => "PORT_OPEN_FAILED",
            WinixError::ReadError(_) => "READ_ERROR",
            WinixError::WriteError(_) => "WRITE_ERROR",
            WinixError::Disconnected => "DISCONNECTED",
            WinixError::InvalidPrefix(_) => "INVALID_PREFIX",
            WinixError::UnsupportedSentence(_) => "UNSUPPORTED_SENTENCE",
            WinixError::InvalidApiCode(_) => "INVALID_API_CODE",
            WinixError::UnknownApiCode { .. } => "UNKNOWN_API_CODE",
            WinixError::InvalidToken(_) => "INVALID_TOKEN",
            WinixError::InvalidKey(_) => "INVALID_KEY",
            WinixError::InvalidControl(_) => "INVALID_CONTROL",
            WinixError::InvalidConfig(_) => "INVALID_CONFIG",
            WinixError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias for Winix operations
pub type Result<T> = std::result::Result<T, WinixError>;

// Conversion from serialport error (only when serial feature is enabled)
#[cfg(feature = "serial")]
impl From<serialport::Error> for WinixError {
    fn from(err: serialport::Error) -> Self {
        match err.kind {
            serialport::ErrorKind::NoDevice => WinixError::PortNotFound(err.description),
            serialport::ErrorKind::Io(kind) => {
                WinixError::Io(std::io::Error::new(kind, err.description))
            }
            _ => WinixError::PortOpenFailed {
                port: String::new(),
                reason: err.description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = WinixError::PortNotFound("/dev/ttyUSB0".to_string());
        assert_eq!(err.error_code(), "PORT_NOT_FOUND");
        assert_eq!(
            WinixError::InvalidToken("BAD".to_string()).error_code(),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(WinixError::InvalidPrefix("xx".to_string()).is_protocol_error());
        assert!(WinixError::UnknownApiCode {
            code: 999,
            sentence: "AWS_SEND=A999".to_string()
        }
        .is_protocol_error());
        assert!(!WinixError::Disconnected.is_protocol_error());
    }

    #[test]
    fn test_is_transport_error() {
        assert!(WinixError::Disconnected.is_transport_error());
        assert!(WinixError::WriteError("broken pipe".to_string()).is_transport_error());
        assert!(!WinixError::InvalidKey("ABCD".to_string()).is_transport_error());
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_from_serialport_error() {
        let err: WinixError =
            serialport::Error::new(serialport::ErrorKind::NoDevice, "/dev/ttyUSB9").into();
        assert!(matches!(err, WinixError::PortNotFound(ref p) if p == "/dev/ttyUSB9"));

        let err: WinixError =
            serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud").into();
        assert_eq!(err.error_code(), "PORT_OPEN_FAILED");
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_unknown_api_code_message() {
        let err = WinixError::UnknownApiCode {
            code: 250,
            sentence: "AWS_SEND=A250 {}".to_string(),
        };
        assert!(err.to_string().contains("250"));
    }
}
