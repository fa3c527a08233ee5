//! Test utilities for driving the engine without hardware
//!
//! [`MockTransport`] stands in for the UART: tests queue bytes the MCU
//! would send and inspect the sentences the engine wrote back.
//! [`RecordingSink`] captures entity notifications.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use winix_c545::{EntityRegistry, WinixEngine};
//! use winix_c545::test_utils::MockTransport;
//!
//! let mut transport = MockTransport::new();
//! transport.queue_incoming(b"AT*ICT*MIB=32\r\n");
//!
//! let now = Instant::now();
//! let mut engine = WinixEngine::new(transport, EntityRegistry::new(), now);
//! engine.tick(now);
//!
//! assert_eq!(engine.transport().sentences(), vec!["MIB:OK 7595"]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::{TX_PREFIX, TX_TERMINATOR};
use crate::engine::WinixEngine;
use crate::entity::{AttributeUpdate, EntityRegistry, EntitySink};
use crate::error::{Result, WinixError};
use crate::interface::Transport;

/// In-memory transport
#[derive(Debug, Default)]
pub struct MockTransport {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    fail_next_read: bool,
    fail_writes: bool,
}

impl MockTransport {
    /// Create an empty mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if sent by the MCU
    pub fn queue_incoming(&mut self, data: &[u8]) {
        self.incoming.extend(data.iter().copied());
    }

    /// Queue one sentence with `\r\n` appended
    pub fn queue_sentence(&mut self, sentence: &str) {
        self.queue_incoming(sentence.as_bytes());
        self.queue_incoming(b"\r\n");
    }

    /// Bytes not yet read by the engine
    pub fn unread(&self) -> usize {
        self.incoming.len()
    }

    /// Raw bytes written by the engine
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Written sentences with the TX prefix and terminator removed
    pub fn sentences(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .split(TX_TERMINATOR)
            .filter(|s| !s.is_empty())
            .map(|s| s.strip_prefix(TX_PREFIX).unwrap_or(s).to_string())
            .collect()
    }

    /// Forget everything written so far
    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Fail the next read without consuming a byte
    pub fn fail_next_read(&mut self) {
        self.fail_next_read = true;
    }

    /// Fail every write while enabled
    pub fn fail_writes(&mut self, enabled: bool) {
        self.fail_writes = enabled;
    }
}

impl Transport for MockTransport {
    fn available(&mut self) -> usize {
        self.incoming.len()
    }

    fn read_byte(&mut self) -> Result<u8> {
        if self.fail_next_read {
            self.fail_next_read = false;
            return Err(WinixError::ReadError("Simulated error".to_string()));
        }
        self.incoming.pop_front().ok_or(WinixError::Disconnected)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(WinixError::WriteError("Simulated error".to_string()));
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn name(&self) -> &str {
        "MockTransport"
    }
}

/// Entity sink that records every update it receives
///
/// Clones share the same record, so one sink can be registered for
/// several entities and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<AttributeUpdate>>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clone of this sink for every entity
    pub fn register_all(&self, registry: &mut EntityRegistry) {
        registry.set_fan(self.clone());
        registry.set_aqi_sensor(self.clone());
        registry.set_aqi_indicator_sensor(self.clone());
        registry.set_light_sensor(self.clone());
        registry.set_filter_age_sensor(self.clone());
        registry.set_plasmawave_switch(self.clone());
        registry.set_auto_switch(self.clone());
        registry.set_sleep_switch(self.clone());
    }

    /// Updates received so far
    pub fn updates(&self) -> Vec<AttributeUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Forget recorded updates
    pub fn clear(&self) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.clear();
        }
    }
}

impl EntitySink for RecordingSink {
    fn on_attribute_changed(&mut self, update: &AttributeUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(*update);
        }
    }
}

/// Engine over a mock transport with every entity recorded
pub struct TestFixture {
    /// Engine under test
    pub engine: WinixEngine<MockTransport>,
    /// Recorder registered for every entity
    pub sink: RecordingSink,
    /// Time the engine was created
    pub start: Instant,
}

impl TestFixture {
    /// Create a fixture with default protocol settings
    pub fn new() -> Self {
        let start = Instant::now();
        let sink = RecordingSink::new();
        let mut entities = EntityRegistry::new();
        sink.register_all(&mut entities);

        Self {
            engine: WinixEngine::new(MockTransport::new(), entities, start),
            sink,
            start,
        }
    }

    /// Queue a sentence and run ticks until it has been dispatched
    pub fn receive(&mut self, sentence: &str, now: Instant) {
        self.engine.transport_mut().queue_sentence(sentence);
        while self.engine.transport().unread() > 0 {
            self.engine.tick(now);
        }
    }

    /// Sentences written so far
    pub fn sentences(&self) -> Vec<String> {
        self.engine.transport().sentences()
    }

    /// Forget written sentences
    pub fn clear_sentences(&mut self) {
        self.engine.transport_mut().clear_written();
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
