//! AWS key-value sub-protocol
//!
//! Device telemetry and control ride inside `AWS_SEND` / `AWS_RECV`
//! sentences, named after the cloud service the OEM module talks to.
//! Each message carries a numeric API code and, for state messages, a
//! flat JSON-like object whose values are always quoted integers:
//!
//! ```text
//! AWS_SEND=A210 {"A02":"1","A03":"02","A04":"02","S07":"01","S08":"97"}
//! AWS_SEND=A220 {"S07":"01","S08":"116","S14":"34"}
//! AWS_RECV:A211 12 {"A02":"1","A04":"3"}
//! ```
//!
//! Decoding is all-or-nothing: a single malformed token rejects the whole
//! message so partial state is never applied.

use std::fmt::Write;

use crate::error::{Result, WinixError};
use crate::state::{StateKey, StateMap};

/// Leading token of AWS messages sent by the MCU
pub const AWS_SEND: &str = "AWS_SEND";

/// Envelope prefix of outgoing state messages
pub const AWS_RECV_PREFIX: &str = "AWS_RECV:A211 12 ";

/// Acknowledgement of a received AWS message
pub const AWS_SEND_OK: &str = "AWS_SEND:OK";

/// Delivery indication following the acknowledgement
pub const AWS_IND_SEND_OK: &str = "AWS_IND:SEND OK";

/// Disconnect indication
pub const AWS_IND_DISCONNECTED: &str = "AWS_IND:DISCONNECTED";

/// Connection established indication
pub const AWS_IND_CONNECT_OK: &str = "AWS_IND:CONNECT OK";

/// API code: MCU reports the cloud link as disconnected
pub const API_DISCONNECT: u16 = 102;
/// API code: full device state
pub const API_DEVICE_STATE: u16 = 210;
/// API code: sensor update
pub const API_SENSOR_UPDATE: u16 = 220;
/// API code: error report
pub const API_ERROR_INFO: u16 = 230;
/// API code: version information
pub const API_VERSION_INFO: u16 = 240;

const API_CODE_PREFIX: &str = "AWS_SEND=A";
const MAX_API_CODE_DIGITS: usize = 3;

/// A decoded `AWS_SEND` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwsMessage {
    /// Disconnect notice (API 102)
    Disconnect,
    /// Device state or sensor update (API 210 / 220)
    StateUpdate {
        /// API code the states arrived with
        code: u16,
        /// Decoded key-value pairs
        states: StateMap,
    },
    /// Error report (API 230), payload kept verbatim
    ErrorInfo(String),
    /// Version information (API 240), payload kept verbatim
    VersionInfo(String),
}

impl AwsMessage {
    /// Decode an `AWS_SEND=A<code> <payload>` sentence (receive prefix stripped)
    pub fn decode(sentence: &str) -> Result<Self> {
        let (code, payload) = split_api_code(sentence)?;

        match code {
            API_DISCONNECT => Ok(AwsMessage::Disconnect),
            API_DEVICE_STATE | API_SENSOR_UPDATE => Ok(AwsMessage::StateUpdate {
                code,
                states: decode_states(payload)?,
            }),
            API_ERROR_INFO => Ok(AwsMessage::ErrorInfo(payload.to_string())),
            API_VERSION_INFO => Ok(AwsMessage::VersionInfo(payload.to_string())),
            _ => Err(WinixError::UnknownApiCode {
                code,
                sentence: sentence.to_string(),
            }),
        }
    }

    /// API code of this message
    pub fn api_code(&self) -> u16 {
        match self {
            AwsMessage::Disconnect => API_DISCONNECT,
            AwsMessage::StateUpdate { code, .. } => *code,
            AwsMessage::ErrorInfo(_) => API_ERROR_INFO,
            AwsMessage::VersionInfo(_) => API_VERSION_INFO,
        }
    }
}

/// Extract the numeric API code and the remaining payload
fn split_api_code(sentence: &str) -> Result<(u16, &str)> {
    let rest = sentence
        .strip_prefix(API_CODE_PREFIX)
        .ok_or_else(|| WinixError::InvalidApiCode(sentence.to_string()))?;

    let digits = rest
        .bytes()
        .take(MAX_API_CODE_DIGITS)
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return Err(WinixError::InvalidApiCode(sentence.to_string()));
    }

    let code = rest[..digits]
        .parse::<u16>()
        .map_err(|_| WinixError::InvalidApiCode(sentence.to_string()))?;

    Ok((code, rest[digits..].trim_start()))
}

/// Decode a `{"K1":"V1","K2":"V2"}` body into a StateMap
pub fn decode_states(payload: &str) -> Result<StateMap> {
    let start = payload
        .find('{')
        .ok_or_else(|| WinixError::InvalidToken(payload.to_string()))?;
    let body = payload[start + 1..]
        .trim_end()
        .strip_suffix('}')
        .ok_or_else(|| WinixError::InvalidToken(payload.to_string()))?;

    let mut states = StateMap::new();
    for token in body.split(',') {
        let (key, value) = decode_token(token.trim())?;
        states.insert(key, value);
    }

    Ok(states)
}

/// Decode one `"KEY":"VALUE"` token
fn decode_token(token: &str) -> Result<(StateKey, u16)> {
    let invalid = || WinixError::InvalidToken(token.to_string());

    let (key, value) = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .and_then(|t| t.split_once("\":\""))
        .ok_or_else(invalid)?;

    let key = StateKey::new(key).map_err(|_| invalid())?;

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value = value.parse::<u16>().map_err(|_| invalid())?;

    Ok((key, value))
}

/// Encode a StateMap as an `AWS_RECV` state sentence
///
/// Returns `None` for an empty map; an empty frame is never sent.
pub fn encode_state_sentence(states: &StateMap) -> Option<String> {
    if states.is_empty() {
        return None;
    }

    let mut sentence = String::from(AWS_RECV_PREFIX);
    sentence.push('{');
    for (i, (key, value)) in states.iter().enumerate() {
        if i > 0 {
            sentence.push(',');
        }
        // Writing into a String cannot fail
        let _ = write!(sentence, "\"{}\":\"{}\"", key, value);
    }
    sentence.push('}');

    Some(sentence)
}
