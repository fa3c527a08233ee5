//! Protocol key-value batches
//!
//! The MCU reports and accepts device state as short keys (`A02`, `S08`)
//! mapped to unsigned values. A [`StateMap`] is one such batch: built for a
//! single incoming message or outgoing control request and then dropped.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WinixError};

/// Maximum length of a protocol key
pub const MAX_KEY_LENGTH: usize = 3;

/// Power (1 on, 0 off)
pub const KEY_POWER: &str = "A02";
/// Mode (1 auto, 2 manual)
pub const KEY_AUTO: &str = "A03";
/// Fan speed (1-3, 5 turbo, 6 sleep)
pub const KEY_SPEED: &str = "A04";
/// Plasmawave (1 on, 0 off)
pub const KEY_PLASMAWAVE: &str = "A07";
/// Filter age in hours
pub const KEY_FILTER_AGE: &str = "A21";
/// AQI indicator light category
pub const KEY_AQI_INDICATOR: &str = "S07";
/// Air quality index
pub const KEY_AQI: &str = "S08";
/// Ambient light level
pub const KEY_LIGHT: &str = "S14";

/// A validated protocol key of 1 to 3 ASCII alphanumeric characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey(String);

impl StateKey {
    /// Validate and wrap a key
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty()
            || key.len() > MAX_KEY_LENGTH
            || !key.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(WinixError::InvalidKey(key.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StateKey {
    type Err = WinixError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StateKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for StateKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ordered batch of protocol key-value pairs
///
/// Ordering by key keeps outgoing serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMap {
    entries: BTreeMap<StateKey, u16>,
}

impl StateMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the key
    pub fn insert(&mut self, key: StateKey, value: u16) -> Option<u16> {
        self.entries.insert(key, value)
    }

    /// Insert using one of the crate's key constants
    pub(crate) fn insert_known(&mut self, key: &'static str, value: u16) {
        self.entries.insert(StateKey(key.to_string()), value);
    }

    /// Look up a value by key string
    pub fn get(&self, key: &str) -> Option<u16> {
        self.entries.get(key).copied()
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no pairs
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, u16)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(StateKey, u16)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (StateKey, u16)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StateMap {
    type Item = (&'a StateKey, &'a u16);
    type IntoIter = std::collections::btree_map::Iter<'a, StateKey, u16>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
