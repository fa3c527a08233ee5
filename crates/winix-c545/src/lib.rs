//! Winix C545 Air Purifier UART Bridge
//!
//! This crate replaces the OEM WiFi module of a Winix C545 air purifier.
//! It speaks the MCU's line-oriented UART protocol, keeps a cache of the
//! purifier's attributes, and exposes them to a host controller as typed
//! entities (fan, sensors, switches).
//!
//! # Architecture
//!
//! The bridge operates in four layers:
//!
//! 1. **Transport** - Non-blocking byte access to the UART
//! 2. **Framing and dispatch** - CR-terminated sentences, classified by command
//! 3. **Protocol state** - Connection handshake and AWS key/value state sync
//! 4. **Entities** - Attribute notifications out, control requests in
//!
//! # Quick Start
//!
//! ```rust,ignore
//! // Enable the `serial` feature to use SerialTransport
//! // Cargo.toml: winix-c545 = { version = "0.1", features = ["serial"] }
//!
//! use std::time::Instant;
//! use winix_c545::{ControlRequest, EntityRegistry, SerialTransport, WinixEngine};
//!
//! let mut transport = SerialTransport::new("/dev/ttyUSB0");
//! transport.open()?;
//!
//! let mut entities = EntityRegistry::new();
//! entities.set_fan(|update: &winix_c545::AttributeUpdate| println!("{update}"));
//!
//! let mut engine = WinixEngine::new(transport, entities, Instant::now());
//! engine.on_control_request(ControlRequest::fan(Some(true), Some(2)))?;
//!
//! loop {
//!     engine.tick(Instant::now());
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```
//!
//! # Features
//!
//! - `serial` - Serial port transport
//!
//! # Protocol Details
//!
//! - MCU → bridge: `AT*ICT*<payload>\r\n`
//! - bridge → MCU: `*ICT*<payload>\r\n`
//!
//! Attribute state travels as a flat JSON-like object of three-character
//! keys and decimal string values, e.g. `{"A02":"1","A04":"5"}`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Wire layer
pub mod config;
pub mod error;
pub mod framer;
pub mod interface;

// Protocol layer
pub mod aws;
pub mod dispatcher;
pub mod handshake;
pub mod state;

// Entity layer
pub mod entity;
pub mod sync;

// Engine
pub mod engine;

// Testing utilities
pub mod test_utils;

pub use config::{ProtocolConfig, SerialConfig, WinixConfig, WinixConfigBuilder};
pub use error::{Result, WinixError};
pub use interface::Transport;

#[cfg(feature = "serial")]
pub use interface::SerialTransport;

pub use aws::{decode_states, encode_state_sentence, AwsMessage};
pub use dispatcher::{parse_sentence, Inbound};
pub use framer::LineFramer;
pub use handshake::{Handshake, HandshakeState};
pub use state::{StateKey, StateMap};

pub use entity::{
    AqiIndicator, Attribute, AttributeUpdate, ControlRequest, EntityRegistry, EntitySink,
    FanTraits,
};
pub use sync::{DeviceAttributes, StateSynchronizer};

pub use engine::{EngineStats, WinixEngine};

pub use test_utils::{MockTransport, RecordingSink, TestFixture};

// Protocol constants re-exports
pub use config::{
    DEFAULT_BAUD_RATE, DEFAULT_HANDSHAKE_TIMEOUT, MAX_LINE_LENGTH, OEM_MODULE_VERSION, RX_PREFIX,
    TX_PREFIX,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
