//! Register values and ordered registration sets

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// A named register reading
///
/// Names are stable identifiers such as `TOTAL_ENERGY`, an OBIS code string
/// like `1.20`, or `#<n>` for unrecognised IEC lines. Values are decimal
/// renderings of decoded integers or raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue {
    pub name: String,
    pub value: String,
}

impl RegisterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Name to value mapping that remembers insertion order
///
/// Inserting an existing name replaces its value in place, so the position
/// of a register is fixed by its first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationSet {
    entries: Vec<RegisterValue>,
}

impl RegistrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a register, returning the replaced value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => Some(std::mem::replace(&mut entry.value, value)),
            None => {
                self.entries.push(RegisterValue { name, value });
                None
            }
        }
    }

    /// Get the value registered under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisterValue> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Right-biased merge: registers of `other` win on name collision
    pub fn merge(mut self, other: RegistrationSet) -> Self {
        self.extend(other);
        self
    }
}

impl Extend<RegisterValue> for RegistrationSet {
    fn extend<T: IntoIterator<Item = RegisterValue>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry.name, entry.value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RegistrationSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl IntoIterator for RegistrationSet {
    type Item = RegisterValue;
    type IntoIter = std::vec::IntoIter<RegisterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a RegistrationSet {
    type Item = &'a RegisterValue;
    type IntoIter = std::slice::Iter<'a, RegisterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for RegistrationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.value)?;
        }
        map.end()
    }
}
