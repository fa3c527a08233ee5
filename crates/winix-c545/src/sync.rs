//! Device state synchronization
//!
//! The purifier can be changed from two sides: the physical front panel
//! (reported by the MCU in API 210/220 messages) and the host (control
//! requests from entities). [`StateSynchronizer`] keeps the last accepted
//! value of every attribute and turns both directions into minimal diffs:
//!
//! - incoming StateMaps produce one [`AttributeUpdate`] per attribute that
//!   actually changed
//! - outgoing control requests produce a StateMap holding only the
//!   attributes that differ from the cached state
//!
//! # Fan speed encoding
//!
//! | Wire | Logical |
//! |------|---------|
//! | 1-3  | speed 1-3 |
//! | 5    | speed 4 (turbo) |
//! | 6    | sleep mode, speed unchanged |

use tracing::{debug, trace, warn};

use crate::entity::{AqiIndicator, AttributeUpdate, ControlRequest, FAN_SPEED_COUNT};
use crate::error::{Result, WinixError};
use crate::state::{
    StateMap, KEY_AQI, KEY_AQI_INDICATOR, KEY_AUTO, KEY_FILTER_AGE, KEY_LIGHT, KEY_PLASMAWAVE,
    KEY_POWER, KEY_SPEED,
};

/// Wire value of the turbo speed
pub const WIRE_SPEED_TURBO: u16 = 5;
/// Wire value of sleep mode
pub const WIRE_SPEED_SLEEP: u16 = 6;

const WIRE_ON: u16 = 1;
const WIRE_OFF: u16 = 0;
const WIRE_MODE_AUTO: u16 = 1;
const WIRE_MODE_MANUAL: u16 = 2;

/// Convert a logical speed to its wire value
pub fn speed_to_wire(speed: u8) -> u16 {
    if speed == FAN_SPEED_COUNT {
        WIRE_SPEED_TURBO
    } else {
        u16::from(speed)
    }
}

/// Convert a wire speed to a logical speed; sleep and unknown values give `None`
pub fn speed_from_wire(value: u16) -> Option<u8> {
    match value {
        WIRE_SPEED_TURBO => Some(FAN_SPEED_COUNT),
        1..=3 => Some(value as u8),
        _ => None,
    }
}

/// Last accepted value of every tracked attribute
///
/// `None` means the value has not been learned yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAttributes {
    /// Fan power
    pub power: Option<bool>,
    /// Logical fan speed
    pub speed: Option<u8>,
    /// Air quality index
    pub aqi: Option<u16>,
    /// AQI indicator category
    pub aqi_indicator: Option<AqiIndicator>,
    /// Ambient light level
    pub light: Option<u16>,
    /// Filter age in hours
    pub filter_age: Option<u16>,
    /// Plasmawave on/off
    pub plasmawave: Option<bool>,
    /// Automatic mode on/off
    pub auto_mode: Option<bool>,
    /// Sleep mode on/off
    pub sleep: Option<bool>,
}

impl DeviceAttributes {
    /// Effective wire speed: sleep overrides the logical speed
    pub fn wire_speed(&self) -> Option<u16> {
        if self.sleep == Some(true) {
            Some(WIRE_SPEED_SLEEP)
        } else {
            self.speed.map(speed_to_wire)
        }
    }
}

/// Store `value` in `slot` and record an update if it changed
fn set<T: PartialEq + Copy>(
    slot: &mut Option<T>,
    value: T,
    update: fn(T) -> AttributeUpdate,
    changes: &mut Vec<AttributeUpdate>,
) {
    if *slot != Some(value) {
        *slot = Some(value);
        changes.push(update(value));
    }
}

/// Diffs protocol state against the cached device attributes
#[derive(Debug, Clone, Default)]
pub struct StateSynchronizer {
    attributes: DeviceAttributes,
}

impl StateSynchronizer {
    /// Create with nothing learned
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached attributes
    pub fn attributes(&self) -> &DeviceAttributes {
        &self.attributes
    }

    /// Forget every learned value
    pub fn reset(&mut self) {
        self.attributes = DeviceAttributes::default();
    }

    /// Apply a StateMap, returning one update per changed attribute
    pub fn apply(&mut self, states: &StateMap) -> Vec<AttributeUpdate> {
        let attrs = &mut self.attributes;
        let mut changes = Vec::new();

        for (key, value) in states.iter() {
            match key.as_str() {
                KEY_POWER => set(
                    &mut attrs.power,
                    value == WIRE_ON,
                    AttributeUpdate::Power,
                    &mut changes,
                ),
                KEY_AUTO => set(
                    &mut attrs.auto_mode,
                    value == WIRE_MODE_AUTO,
                    AttributeUpdate::Auto,
                    &mut changes,
                ),
                KEY_SPEED => {
                    if value == WIRE_SPEED_SLEEP {
                        set(&mut attrs.sleep, true, AttributeUpdate::Sleep, &mut changes);
                    } else if let Some(speed) = speed_from_wire(value) {
                        set(&mut attrs.speed, speed, AttributeUpdate::Speed, &mut changes);
                        set(&mut attrs.sleep, false, AttributeUpdate::Sleep, &mut changes);
                    } else {
                        warn!(value, "Ignoring unknown fan speed");
                    }
                }
                KEY_PLASMAWAVE => set(
                    &mut attrs.plasmawave,
                    value == WIRE_ON,
                    AttributeUpdate::Plasmawave,
                    &mut changes,
                ),
                KEY_FILTER_AGE => set(
                    &mut attrs.filter_age,
                    value,
                    AttributeUpdate::FilterAge,
                    &mut changes,
                ),
                KEY_AQI_INDICATOR => set(
                    &mut attrs.aqi_indicator,
                    AqiIndicator::from_wire(value),
                    AttributeUpdate::AqiIndicator,
                    &mut changes,
                ),
                KEY_AQI => set(&mut attrs.aqi, value, AttributeUpdate::Aqi, &mut changes),
                KEY_LIGHT => set(&mut attrs.light, value, AttributeUpdate::Light, &mut changes),
                other => trace!(key = other, value, "Ignoring untracked key"),
            }
        }

        if !changes.is_empty() {
            debug!(changed = changes.len(), received = states.len(), "Attributes changed");
        }
        changes
    }

    /// Build the StateMap for a control request, holding only real changes
    ///
    /// Speed is compared by effective wire value, so requesting a speed
    /// while asleep leaves sleep mode. When both speed and sleep-on are
    /// requested, sleep wins.
    pub fn build_control_diff(&self, request: &ControlRequest) -> Result<StateMap> {
        let attrs = &self.attributes;
        let mut diff = StateMap::new();

        if let Some(power) = request.power {
            if attrs.power != Some(power) {
                diff.insert_known(KEY_POWER, if power { WIRE_ON } else { WIRE_OFF });
            }
        }

        if let Some(auto_mode) = request.auto_mode {
            if attrs.auto_mode != Some(auto_mode) {
                let mode = if auto_mode { WIRE_MODE_AUTO } else { WIRE_MODE_MANUAL };
                diff.insert_known(KEY_AUTO, mode);
            }
        }

        let mut wire_speed = match request.speed {
            Some(speed) if (1..=FAN_SPEED_COUNT).contains(&speed) => Some(speed_to_wire(speed)),
            Some(speed) => {
                return Err(WinixError::InvalidControl(format!(
                    "fan speed {} outside 1..={}",
                    speed, FAN_SPEED_COUNT
                )))
            }
            None => None,
        };
        match request.sleep {
            Some(true) => wire_speed = Some(WIRE_SPEED_SLEEP),
            Some(false) if wire_speed.is_none() && attrs.sleep == Some(true) => {
                wire_speed = Some(speed_to_wire(attrs.speed.unwrap_or(1)));
            }
            _ => {}
        }
        if let Some(wire_speed) = wire_speed {
            if attrs.wire_speed() != Some(wire_speed) {
                diff.insert_known(KEY_SPEED, wire_speed);
            }
        }

        if let Some(plasmawave) = request.plasmawave {
            if attrs.plasmawave != Some(plasmawave) {
                diff.insert_known(KEY_PLASMAWAVE, if plasmawave { WIRE_ON } else { WIRE_OFF });
            }
        }

        Ok(diff)
    }
}
