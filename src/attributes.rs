//! Ordered per-node attribute storage.
//!
//! # Overview
//! Every node in a tree owns one [`Attributes`] store: an ordered mapping
//! from attribute name to a loosely-typed [`AttributeValue`]. Three keys are
//! reserved and exposed through typed, defaulted accessors:
//!
//! | Key       | Type  | Default | Meaning                                  |
//! |-----------|-------|---------|------------------------------------------|
//! | `Name`    | text  | `""`    | taxon / node label                       |
//! | `Length`  | float | `NaN`   | length of the edge to the parent         |
//! | `Support` | float | `NaN`   | support value for the edge to the parent |
//!
//! `NaN` means "not specified", not zero: a parsed tree without branch
//! lengths keeps `NaN` everywhere and measurement code can tell the two
//! apart. Insertion order is preserved so that cloning a node copies its
//! attributes wholesale without reordering them.

use std::fmt;

/// Reserved key for the node label.
pub const NAME: &str = "Name";
/// Reserved key for the branch length to the parent.
pub const LENGTH: &str = "Length";
/// Reserved key for the support of the edge to the parent.
pub const SUPPORT: &str = "Support";

/// A loosely-typed attribute value: either text or a floating-point number.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
}

impl AttributeValue {
    /// Returns the text content, or `None` for numbers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Number(_) => None,
        }
    }

    /// Returns the numeric content, or `None` for text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Text(_) => None,
            AttributeValue::Number(x) => Some(*x),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Number(x)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::Number(x) => write!(f, "{x}"),
        }
    }
}

/// Ordered name → value attribute store owned by every tree node.
///
/// Entries keep their insertion order; setting an existing key replaces the
/// value in place. The reserved keys are only stored once they have been
/// set, so a fresh store is empty but still answers the typed accessors
/// with their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    /// Looks up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Sets an attribute, replacing an existing entry in place or appending
    /// a new one at the end.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Removes an attribute, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Node label; defaults to the empty string.
    pub fn name(&self) -> &str {
        self.get(NAME).and_then(AttributeValue::as_text).unwrap_or("")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set(NAME, name.into());
    }

    /// Length of the edge to the parent; defaults to `NaN` ("not specified").
    pub fn length(&self) -> f64 {
        self.get(LENGTH)
            .and_then(AttributeValue::as_number)
            .unwrap_or(f64::NAN)
    }

    pub fn set_length(&mut self, length: f64) {
        self.set(LENGTH, length);
    }

    /// Support of the edge to the parent; defaults to `NaN` ("not specified").
    pub fn support(&self) -> f64 {
        self.get(SUPPORT)
            .and_then(AttributeValue::as_number)
            .unwrap_or(f64::NAN)
    }

    pub fn set_support(&mut self, support: f64) {
        self.set(SUPPORT, support);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_default() {
        let attrs = Attributes::new();
        assert_eq!(attrs.name(), "");
        assert!(attrs.length().is_nan());
        assert!(attrs.support().is_nan());
        assert!(attrs.is_empty());
    }

    #[test]
    fn set_replaces_in_place() {
        let mut attrs = Attributes::new();
        attrs.set("habitat", "marine");
        attrs.set_length(1.5);
        attrs.set("habitat", "riverine");

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["habitat", LENGTH]);
        assert_eq!(attrs.get("habitat").unwrap().as_text(), Some("riverine"));
        assert_eq!(attrs.length(), 1.5);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut attrs = Attributes::new();
        attrs.set_name("Kiwi");
        attrs.set("clade", "Apterygidae");
        attrs.set_support(0.95);

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![NAME, "clade", SUPPORT]);
    }
}
