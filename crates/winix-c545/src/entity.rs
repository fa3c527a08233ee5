//! Entity-facing interface
//!
//! The host exposes the purifier as a fan (power and speed), four sensors
//! and three switches. Each is optional: an entity that was not configured
//! simply never hears about its attribute.

use std::fmt;

/// Number of logical fan speeds; the top speed is "turbo"
pub const FAN_SPEED_COUNT: u8 = 4;

/// Identifier of a tracked device attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    /// Fan power
    Power,
    /// Logical fan speed
    Speed,
    /// Air quality index
    Aqi,
    /// AQI indicator light category
    AqiIndicator,
    /// Ambient light level
    Light,
    /// Filter age in hours
    FilterAge,
    /// Plasmawave ionizer
    Plasmawave,
    /// Automatic mode
    Auto,
    /// Sleep mode
    Sleep,
}

impl Attribute {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Power => "power",
            Attribute::Speed => "speed",
            Attribute::Aqi => "aqi",
            Attribute::AqiIndicator => "aqi_indicator",
            Attribute::Light => "light",
            Attribute::FilterAge => "filter_age",
            Attribute::Plasmawave => "plasmawave",
            Attribute::Auto => "auto",
            Attribute::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category shown by the AQI indicator light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiIndicator {
    /// Blue
    Good,
    /// Amber
    Fair,
    /// Red
    Poor,
    /// Value outside the known table
    Unknown(u16),
}

impl AqiIndicator {
    /// Map a wire value to its category
    pub fn from_wire(value: u16) -> Self {
        match value {
            1 => AqiIndicator::Good,
            2 => AqiIndicator::Fair,
            3 => AqiIndicator::Poor,
            other => AqiIndicator::Unknown(other),
        }
    }
}

impl fmt::Display for AqiIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AqiIndicator::Good => write!(f, "good"),
            AqiIndicator::Fair => write!(f, "fair"),
            AqiIndicator::Poor => write!(f, "poor"),
            AqiIndicator::Unknown(value) => write!(f, "unknown({})", value),
        }
    }
}

/// A changed attribute and its new value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUpdate {
    /// Fan power
    Power(bool),
    /// Logical fan speed, 1 to [`FAN_SPEED_COUNT`]
    Speed(u8),
    /// Air quality index
    Aqi(u16),
    /// AQI indicator category
    AqiIndicator(AqiIndicator),
    /// Ambient light level
    Light(u16),
    /// Filter age in hours
    FilterAge(u16),
    /// Plasmawave on/off
    Plasmawave(bool),
    /// Automatic mode on/off
    Auto(bool),
    /// Sleep mode on/off
    Sleep(bool),
}

impl AttributeUpdate {
    /// Attribute this update belongs to
    pub fn attribute(&self) -> Attribute {
        match self {
            AttributeUpdate::Power(_) => Attribute::Power,
            AttributeUpdate::Speed(_) => Attribute::Speed,
            AttributeUpdate::Aqi(_) => Attribute::Aqi,
            AttributeUpdate::AqiIndicator(_) => Attribute::AqiIndicator,
            AttributeUpdate::Light(_) => Attribute::Light,
            AttributeUpdate::FilterAge(_) => Attribute::FilterAge,
            AttributeUpdate::Plasmawave(_) => Attribute::Plasmawave,
            AttributeUpdate::Auto(_) => Attribute::Auto,
            AttributeUpdate::Sleep(_) => Attribute::Sleep,
        }
    }
}

impl fmt::Display for AttributeUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.attribute().name();
        match self {
            AttributeUpdate::Power(v)
            | AttributeUpdate::Plasmawave(v)
            | AttributeUpdate::Auto(v)
            | AttributeUpdate::Sleep(v) => write!(f, "{}={}", name, if *v { "on" } else { "off" }),
            AttributeUpdate::Speed(v) => write!(f, "{}={}", name, v),
            AttributeUpdate::Aqi(v) | AttributeUpdate::Light(v) | AttributeUpdate::FilterAge(v) => {
                write!(f, "{}={}", name, v)
            }
            AttributeUpdate::AqiIndicator(v) => write!(f, "{}={}", name, v),
        }
    }
}

/// Receiver of attribute change notifications
pub trait EntitySink {
    /// Called once per changed attribute
    fn on_attribute_changed(&mut self, update: &AttributeUpdate);
}

impl<F> EntitySink for F
where
    F: FnMut(&AttributeUpdate),
{
    fn on_attribute_changed(&mut self, update: &AttributeUpdate) {
        self(update)
    }
}

type Slot = Option<Box<dyn EntitySink + Send>>;

/// Optional entity per attribute
///
/// The fan receives both power and speed updates.
#[derive(Default)]
pub struct EntityRegistry {
    fan: Slot,
    aqi_sensor: Slot,
    aqi_indicator_sensor: Slot,
    light_sensor: Slot,
    filter_age_sensor: Slot,
    plasmawave_switch: Slot,
    auto_switch: Slot,
    sleep_switch: Slot,
}

impl EntityRegistry {
    /// Create a registry with no entities
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fan (power and speed)
    pub fn set_fan(&mut self, sink: impl EntitySink + Send + 'static) {
        self.fan = Some(Box::new(sink));
    }

    /// Register the AQI sensor
    pub fn set_aqi_sensor(&mut self, sink: impl EntitySink + Send + 'static) {
        self.aqi_sensor = Some(Box::new(sink));
    }

    /// Register the AQI indicator sensor
    pub fn set_aqi_indicator_sensor(&mut self, sink: impl EntitySink + Send + 'static) {
        self.aqi_indicator_sensor = Some(Box::new(sink));
    }

    /// Register the light sensor
    pub fn set_light_sensor(&mut self, sink: impl EntitySink + Send + 'static) {
        self.light_sensor = Some(Box::new(sink));
    }

    /// Register the filter age sensor
    pub fn set_filter_age_sensor(&mut self, sink: impl EntitySink + Send + 'static) {
        self.filter_age_sensor = Some(Box::new(sink));
    }

    /// Register the plasmawave switch
    pub fn set_plasmawave_switch(&mut self, sink: impl EntitySink + Send + 'static) {
        self.plasmawave_switch = Some(Box::new(sink));
    }

    /// Register the auto mode switch
    pub fn set_auto_switch(&mut self, sink: impl EntitySink + Send + 'static) {
        self.auto_switch = Some(Box::new(sink));
    }

    /// Register the sleep switch
    pub fn set_sleep_switch(&mut self, sink: impl EntitySink + Send + 'static) {
        self.sleep_switch = Some(Box::new(sink));
    }

    fn slot_mut(&mut self, attribute: Attribute) -> &mut Slot {
        match attribute {
            Attribute::Power | Attribute::Speed => &mut self.fan,
            Attribute::Aqi => &mut self.aqi_sensor,
            Attribute::AqiIndicator => &mut self.aqi_indicator_sensor,
            Attribute::Light => &mut self.light_sensor,
            Attribute::FilterAge => &mut self.filter_age_sensor,
            Attribute::Plasmawave => &mut self.plasmawave_switch,
            Attribute::Auto => &mut self.auto_switch,
            Attribute::Sleep => &mut self.sleep_switch,
        }
    }

    /// Deliver an update; no-op when the entity is absent
    ///
    /// Returns whether an entity received it.
    pub fn notify(&mut self, update: &AttributeUpdate) -> bool {
        match self.slot_mut(update.attribute()) {
            Some(sink) => {
                sink.on_attribute_changed(update);
                true
            }
            None => false,
        }
    }

    /// Names of the registered entities
    pub fn registered(&self) -> Vec<&'static str> {
        [
            ("fan", self.fan.is_some()),
            ("aqi_sensor", self.aqi_sensor.is_some()),
            ("aqi_indicator_sensor", self.aqi_indicator_sensor.is_some()),
            ("light_sensor", self.light_sensor.is_some()),
            ("filter_age_sensor", self.filter_age_sensor.is_some()),
            ("plasmawave_switch", self.plasmawave_switch.is_some()),
            ("auto_switch", self.auto_switch.is_some()),
            ("sleep_switch", self.sleep_switch.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

/// Capabilities advertised by the fan entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanTraits {
    /// Number of discrete speeds
    pub speed_count: u8,
    /// Whether speed can be set
    pub supports_speed: bool,
}

impl Default for FanTraits {
    fn default() -> Self {
        Self {
            speed_count: FAN_SPEED_COUNT,
            supports_speed: true,
        }
    }
}

/// Requested attribute values from the entity layer
///
/// `None` leaves the attribute alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlRequest {
    /// Fan power
    pub power: Option<bool>,
    /// Logical fan speed, 1 to [`FAN_SPEED_COUNT`]
    pub speed: Option<u8>,
    /// Plasmawave on/off
    pub plasmawave: Option<bool>,
    /// Automatic mode on/off
    pub auto_mode: Option<bool>,
    /// Sleep mode on/off
    pub sleep: Option<bool>,
}

impl ControlRequest {
    /// Fan control call: power and/or speed
    pub fn fan(power: Option<bool>, speed: Option<u8>) -> Self {
        Self {
            power,
            speed,
            ..Self::default()
        }
    }

    /// Set fan power
    pub fn with_power(mut self, on: bool) -> Self {
        self.power = Some(on);
        self
    }

    /// Set fan speed
    pub fn with_speed(mut self, speed: u8) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Set plasmawave
    pub fn with_plasmawave(mut self, on: bool) -> Self {
        self.plasmawave = Some(on);
        self
    }

    /// Set automatic mode
    pub fn with_auto_mode(mut self, on: bool) -> Self {
        self.auto_mode = Some(on);
        self
    }

    /// Set sleep mode
    pub fn with_sleep(mut self, on: bool) -> Self {
        self.sleep = Some(on);
        self
    }

    /// Whether nothing is requested
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_aqi_indicator_table() {
        assert_eq!(AqiIndicator::from_wire(1), AqiIndicator::Good);
        assert_eq!(AqiIndicator::from_wire(2), AqiIndicator::Fair);
        assert_eq!(AqiIndicator::from_wire(3), AqiIndicator::Poor);
        assert_eq!(AqiIndicator::from_wire(9), AqiIndicator::Unknown(9));
    }

    #[test]
    fn test_update_display() {
        assert_eq!(AttributeUpdate::Power(true).to_string(), "power=on");
        assert_eq!(AttributeUpdate::Speed(4).to_string(), "speed=4");
        assert_eq!(
            AttributeUpdate::AqiIndicator(AqiIndicator::Fair).to_string(),
            "aqi_indicator=fair"
        );
    }

    #[test]
    fn test_registry_routes_fan_attributes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut registry = EntityRegistry::new();
        registry.set_fan(move |u: &AttributeUpdate| sink.lock().unwrap().push(*u));

        assert!(registry.notify(&AttributeUpdate::Power(true)));
        assert!(registry.notify(&AttributeUpdate::Speed(2)));
        assert!(!registry.notify(&AttributeUpdate::Aqi(40)));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![AttributeUpdate::Power(true), AttributeUpdate::Speed(2)]
        );
    }

    #[test]
    fn test_registry_lists_registered() {
        let mut registry = EntityRegistry::new();
        assert!(registry.registered().is_empty());

        registry.set_light_sensor(|_: &AttributeUpdate| {});
        registry.set_sleep_switch(|_: &AttributeUpdate| {});
        assert_eq!(registry.registered(), vec!["light_sensor", "sleep_switch"]);
    }

    #[test]
    fn test_control_request_builders() {
        let req = ControlRequest::fan(Some(true), None).with_speed(4);
        assert_eq!(req.power, Some(true));
        assert_eq!(req.speed, Some(4));
        assert!(req.sleep.is_none());
        assert!(ControlRequest::default().is_empty());
        assert!(!req.is_empty());
    }

    #[test]
    fn test_default_fan_traits() {
        let traits = FanTraits::default();
        assert_eq!(traits.speed_count, 4);
        assert!(traits.supports_speed);
    }
}
