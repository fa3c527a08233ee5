//! WinixEngine - protocol engine driven by a periodic tick
//!
//! The engine owns every piece of protocol state: the line framer, the
//! handshake machine, the attribute cache and the entity registry. The host
//! calls [`WinixEngine::tick`] from its main loop and forwards entity
//! control requests to [`WinixEngine::on_control_request`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         WinixEngine                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌───────────┐   ┌────────────┐   ┌──────────────────┐       │
//! │  │ Transport │──►│ LineFramer │──►│ parse_sentence   │       │
//! │  │ (UART)    │   └────────────┘   └────────┬─────────┘       │
//! │  │           │                    ┌────────┴─────────┐       │
//! │  │           │◄───────────────────┤ Handshake  │ AWS │       │
//! │  │           │                    └────────────┬─────┘       │
//! │  │           │   ┌───────────────────┐         ▼             │
//! │  │           │◄──┤ StateSynchronizer │◄── StateMap           │
//! │  └───────────┘   └─────────┬─────────┘                       │
//! │                            ▼                                 │
//! │                    EntityRegistry                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Tick ordering
//!
//! 1. Evaluate the handshake and transmit whatever it emits
//! 2. Flush pending attribute notifications to entities
//! 3. Read bytes until one sentence is complete, then dispatch it
//!
//! At most one sentence is handled per tick; bytes after it stay in the
//! transport for the next tick.

use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::aws::{
    encode_state_sentence, AwsMessage, AWS_IND_DISCONNECTED, AWS_IND_SEND_OK, AWS_SEND_OK,
};
use crate::config::{ProtocolConfig, TX_PREFIX, TX_TERMINATOR};
use crate::dispatcher::{parse_sentence, Inbound};
use crate::entity::{AttributeUpdate, ControlRequest, EntityRegistry, FanTraits};
use crate::error::Result;
use crate::framer::LineFramer;
use crate::handshake::{Handshake, HandshakeState};
use crate::interface::Transport;
use crate::sync::{DeviceAttributes, StateSynchronizer};

/// Engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Complete sentences framed from the transport
    pub sentences_received: u64,
    /// Sentences written to the transport
    pub sentences_sent: u64,
    /// Sentences dropped as malformed, unknown or unsupported
    pub sentences_rejected: u64,
    /// AWS messages decoded
    pub aws_messages: u64,
    /// StateMaps applied from the MCU
    pub state_updates: u64,
    /// Notifications delivered to entities
    pub notifications: u64,
    /// Control requests that produced a sentence
    pub control_requests: u64,
    /// Transport read/write failures
    pub interface_errors: u64,
}

/// Protocol engine for the C545 MCU link
pub struct WinixEngine<T: Transport> {
    /// MCU transport
    transport: T,
    /// Line accumulator
    framer: LineFramer,
    /// Connection handshake
    handshake: Handshake,
    /// Attribute cache and diffing
    sync: StateSynchronizer,
    /// Entities receiving updates
    entities: EntityRegistry,
    /// Updates waiting for the next flush
    pending: Vec<AttributeUpdate>,
    /// Statistics
    stats: EngineStats,
}

impl<T: Transport> WinixEngine<T> {
    /// Create an engine with default protocol settings
    pub fn new(transport: T, entities: EntityRegistry, now: Instant) -> Self {
        Self::with_config(transport, entities, &ProtocolConfig::default(), now)
    }

    /// Create an engine from protocol configuration
    pub fn with_config(
        transport: T,
        entities: EntityRegistry,
        config: &ProtocolConfig,
        now: Instant,
    ) -> Self {
        Self {
            transport,
            framer: LineFramer::with_max_length(config.max_line_length),
            handshake: Handshake::with_timeout(now, config.handshake_timeout),
            sync: StateSynchronizer::new(),
            entities,
            pending: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    /// Run one scheduler tick
    pub fn tick(&mut self, now: Instant) {
        if let Some(payload) = self.handshake.evaluate(now) {
            self.send(payload);
        }

        self.flush_notifications();

        if let Some(sentence) = self.read_sentence() {
            self.dispatch(&sentence, now);
        }
    }

    /// Read bytes until a sentence completes or the transport runs dry
    fn read_sentence(&mut self) -> Option<String> {
        while self.transport.available() > 0 {
            let byte = match self.transport.read_byte() {
                Ok(byte) => byte,
                Err(e) => {
                    warn!(error = %e, transport = self.transport.name(), "Read failed");
                    self.stats.interface_errors += 1;
                    return None;
                }
            };

            if let Some(sentence) = self.framer.feed(byte) {
                self.stats.sentences_received += 1;
                return Some(sentence);
            }
        }
        None
    }

    /// Classify and handle one framed sentence
    pub fn dispatch(&mut self, sentence: &str, now: Instant) {
        debug!(sentence, "Received sentence");

        let inbound = match parse_sentence(sentence) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Dropping sentence");
                self.stats.sentences_rejected += 1;
                return;
            }
        };

        self.handshake.record_event(now);

        match inbound {
            Inbound::Aws(message) => self.handle_aws(message, now),
            Inbound::Mib => {
                info!("MIB:OK");
                self.handshake.force(HandshakeState::Mib, now);
                self.send_reply(&inbound);
            }
            Inbound::McuReady | Inbound::SetMib | Inbound::SMode => {
                info!(?inbound, "Handshake sentence");
                self.send_reply(&inbound);
            }
        }
    }

    fn send_reply(&mut self, inbound: &Inbound) {
        if let Some(reply) = inbound.reply() {
            self.send(reply);
        }
    }

    fn handle_aws(&mut self, message: AwsMessage, now: Instant) {
        self.stats.aws_messages += 1;

        match message {
            AwsMessage::Disconnect => {
                info!("MCU reported disconnect");
                self.acknowledge();
                self.send(AWS_IND_DISCONNECTED);
                self.handshake.force(HandshakeState::Reset, now);
            }
            AwsMessage::StateUpdate { code, states } => {
                info!(code, pairs = states.len(), "State update");
                self.stats.state_updates += 1;
                let updates = self.sync.apply(&states);
                self.pending.extend(updates);
                self.acknowledge();
                self.handshake.force(HandshakeState::Connected, now);
            }
            AwsMessage::ErrorInfo(payload) => {
                info!(payload = %payload, "MCU error report");
                self.acknowledge();
            }
            AwsMessage::VersionInfo(payload) => {
                info!(payload = %payload, "MCU version info");
                self.acknowledge();
            }
        }
    }

    fn acknowledge(&mut self) {
        self.send(AWS_SEND_OK);
        self.send(AWS_IND_SEND_OK);
    }

    /// Write a sentence, logging transport failures
    fn send(&mut self, payload: &str) {
        if let Err(e) = self.write_sentence(payload) {
            warn!(error = %e, payload, "Failed to send sentence");
            self.stats.interface_errors += 1;
        }
    }

    /// Frame and write one sentence: `*ICT*<payload>\r\n`
    pub fn write_sentence(&mut self, payload: &str) -> Result<()> {
        let mut frame =
            String::with_capacity(TX_PREFIX.len() + payload.len() + TX_TERMINATOR.len());
        frame.push_str(TX_PREFIX);
        frame.push_str(payload);
        frame.push_str(TX_TERMINATOR);

        debug!(sentence = %frame.trim_end(), "Sending sentence");
        self.transport.write_bytes(frame.as_bytes())?;
        self.stats.sentences_sent += 1;
        Ok(())
    }

    /// Deliver pending attribute updates to the entities
    pub fn flush_notifications(&mut self) {
        for update in std::mem::take(&mut self.pending) {
            trace!(%update, "Notifying entity");
            if self.entities.notify(&update) {
                self.stats.notifications += 1;
            }
        }
    }

    /// Handle a control request from the entity layer
    ///
    /// The requested values are committed to the attribute cache and
    /// queued as notifications before the diff goes out on the wire.
    pub fn on_control_request(&mut self, request: ControlRequest) -> Result<()> {
        if request.is_empty() {
            debug!("Ignoring empty control request");
            return Ok(());
        }

        let diff = self.sync.build_control_diff(&request)?;
        let Some(sentence) = encode_state_sentence(&diff) else {
            debug!(?request, "Control request changes nothing");
            return Ok(());
        };

        let updates = self.sync.apply(&diff);
        self.pending.extend(updates);

        self.stats.control_requests += 1;
        if let Err(e) = self.write_sentence(&sentence) {
            self.stats.interface_errors += 1;
            return Err(e);
        }
        Ok(())
    }

    /// Current handshake state
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// Whether the handshake has reached steady state
    pub fn is_connected(&self) -> bool {
        self.handshake.is_connected()
    }

    /// Cached device attributes
    pub fn attributes(&self) -> &DeviceAttributes {
        self.sync.attributes()
    }

    /// Updates queued for the next flush
    pub fn pending_notifications(&self) -> &[AttributeUpdate] {
        &self.pending
    }

    /// Engine statistics
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Fan capabilities
    pub fn fan_traits(&self) -> FanTraits {
        FanTraits::default()
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Log the engine configuration
    pub fn log_config(&self) {
        info!("Winix C545:");
        info!("  Transport: {}", self.transport.name());
        info!("  Max line length: {}", self.framer.max_length());
        info!("  Handshake timeout: {:?}", self.handshake.timeout());
        info!("  Fan speeds: {}", self.fan_traits().speed_count);
        info!("  Entities: {}", self.entities.registered().join(", "));
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for WinixEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinixEngine")
            .field("transport", &self.transport)
            .field("handshake", &self.handshake.state())
            .field("pending", &self.pending.len())
            .field("entities", &self.entities)
            .finish()
    }
}
