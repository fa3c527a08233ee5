//! Connection handshake with the MCU
//!
//! ```text
//!            10s idle              MIB=32            next tick
//!  Reset ─────────────► DeviceReady ──────► Mib ─────────────► Connected
//!    ▲                   │      ▲                                  │
//!    │                   └──────┘ 10s idle: re-announce            │
//!    └──────────────────────── API 102 disconnect ─────────────────┘
//! ```
//!
//! The machine is evaluated once per tick. Sentence handlers push it
//! around with [`Handshake::force`] and keep the activity clock fresh with
//! [`Handshake::record_event`].

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::aws::AWS_IND_CONNECT_OK;
use crate::config::DEFAULT_HANDSHAKE_TIMEOUT;

/// Announcement that the module is ready for the MCU
pub const DEVICE_READY: &str = "DEVICEREADY";

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Initial or recovered state, waiting to announce
    Reset,
    /// `DEVICEREADY` sent, waiting for the MCU
    DeviceReady,
    /// `MIB=32` received
    Mib,
    /// Steady state
    Connected,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Reset => write!(f, "reset"),
            HandshakeState::DeviceReady => write!(f, "device_ready"),
            HandshakeState::Mib => write!(f, "mib"),
            HandshakeState::Connected => write!(f, "connected"),
        }
    }
}

/// Handshake state machine
#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
    last_event: Instant,
    timeout: Duration,
}

impl Handshake {
    /// Start in `Reset` with the activity clock at `now`
    pub fn new(now: Instant) -> Self {
        Self::with_timeout(now, DEFAULT_HANDSHAKE_TIMEOUT)
    }

    /// Start in `Reset` with a custom inactivity window
    pub fn with_timeout(now: Instant, timeout: Duration) -> Self {
        Self {
            state: HandshakeState::Reset,
            last_event: now,
            timeout,
        }
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether steady state has been reached
    pub fn is_connected(&self) -> bool {
        self.state == HandshakeState::Connected
    }

    /// Time of the last transition or received event
    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    /// Inactivity window
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Note activity from the MCU
    pub fn record_event(&mut self, now: Instant) {
        self.last_event = now;
    }

    /// Move to `state` regardless of the current one
    pub fn force(&mut self, state: HandshakeState, now: Instant) {
        if self.state != state {
            info!(from = %self.state, to = %state, "Handshake state forced");
        }
        self.state = state;
        self.last_event = now;
    }

    /// Advance on timeouts; returns a sentence payload to transmit
    pub fn evaluate(&mut self, now: Instant) -> Option<&'static str> {
        match self.state {
            HandshakeState::Reset | HandshakeState::DeviceReady => {
                if now.saturating_duration_since(self.last_event) < self.timeout {
                    return None;
                }
                if self.state == HandshakeState::Reset {
                    info!("Announcing device ready");
                } else {
                    debug!("MCU silent, re-announcing device ready");
                }
                self.state = HandshakeState::DeviceReady;
                self.last_event = now;
                Some(DEVICE_READY)
            }
            HandshakeState::Mib => {
                info!("Handshake connected");
                self.state = HandshakeState::Connected;
                self.last_event = now;
                Some(AWS_IND_CONNECT_OK)
            }
            HandshakeState::Connected => None,
        }
    }
}
