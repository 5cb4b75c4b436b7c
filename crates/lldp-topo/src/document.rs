//! Typed views of the JSON documents produced by `lldpcli` and `ip -j`.
//!
//! `lldpcli` collapses one-element lists into bare objects, so list-valued
//! fields are read through [`OneOrMany`] and normalized to a `Vec` here,
//! before any discovery logic sees them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeError;

/// A field that is either a single value or a sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A proper sequence.
    Many(Vec<T>),
    /// A lone value standing in for a one-element sequence.
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    /// Normalize into a sequence.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

impl<'a> OneOrMany<&'a Value> {
    /// View an untyped JSON value as a sequence without copying it.
    #[must_use]
    pub fn borrowed(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Self::Many(items.iter().collect()),
            other => Self::One(other),
        }
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_vec()
    }
}

/// Output of `lldpcli -f json show {interfaces,neighbors} details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LldpDocument {
    #[serde(default)]
    pub lldp: LldpSection,
}

/// The `lldp` object: a list of single-key objects keyed by interface name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LldpSection {
    #[serde(default)]
    pub interface: OneOrMany<Map<String, Value>>,
}

impl LldpDocument {
    /// Interface entries, normalized to a sequence.
    #[must_use]
    pub fn interfaces(&self) -> Vec<&Map<String, Value>> {
        match &self.lldp.interface {
            OneOrMany::Many(items) => items.iter().collect(),
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Output of `lldpcli -f json show chassis details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalChassisDocument {
    #[serde(rename = "local-chassis", default)]
    pub local_chassis: LocalChassisSection,
}

/// The `local-chassis` object, keyed by the chassis name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalChassisSection {
    #[serde(default)]
    pub chassis: Map<String, Value>,
}

/// One entry of `ip -j link list`. Only the name is of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    pub ifname: String,
}

/// Deserialize a command's output.
///
/// # Errors
///
/// Returns [`ShapeError::Json`] if the text is not valid JSON of shape `T`.
pub fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ShapeError> {
    Ok(serde_json::from_str(text)?)
}

/// The only key of `map`, or all of its keys if there is not exactly one.
///
/// # Errors
///
/// Returns the list of keys when the map is empty or has several keys.
pub fn sole_entry(map: &Map<String, Value>) -> Result<(&str, &Value), Vec<String>> {
    let mut iter = map.iter();
    match (iter.next(), iter.next()) {
        (Some((key, value)), None) => Ok((key.as_str(), value)),
        _ => Err(map.keys().cloned().collect()),
    }
}

/// Follow `path` through nested objects and render the scalar found there.
///
/// Strings are returned as-is, numbers and booleans in their JSON form;
/// anything else (including a missing step) yields `None`.
#[must_use]
pub fn nested_text(node: &Value, path: &[&str]) -> Option<String> {
    let mut current = node;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
