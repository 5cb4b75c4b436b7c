//! Bridge/Router/Wlan/Station (BRWS) capability decoding.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::document::OneOrMany;

/// State of a single advertised capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapabilityFlag {
    /// Advertised and enabled.
    Enabled,
    /// Advertised and disabled.
    Disabled,
    /// Not advertised, or advertised without an `enabled` field.
    #[default]
    Unknown,
}

impl CapabilityFlag {
    /// Single-character form used in the BRWS code.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Enabled => '1',
            Self::Disabled => '0',
            Self::Unknown => 'X',
        }
    }
}

/// Capabilities of a chassis, rendered as a 4-character BRWS code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityCode {
    pub bridge: CapabilityFlag,
    pub router: CapabilityFlag,
    pub wlan: CapabilityFlag,
    pub station: CapabilityFlag,
}

impl CapabilityCode {
    /// Flags in BRWS order.
    #[must_use]
    pub fn flags(&self) -> [CapabilityFlag; 4] {
        [self.bridge, self.router, self.wlan, self.station]
    }

    fn slot_mut(&mut self, kind: &str) -> Option<&mut CapabilityFlag> {
        match kind {
            "Bridge" => Some(&mut self.bridge),
            "Router" => Some(&mut self.router),
            "Wlan" => Some(&mut self.wlan),
            "Station" => Some(&mut self.station),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.flags()
            .iter()
            .try_for_each(|flag| write!(f, "{}", flag.as_char()))
    }
}

impl Serialize for CapabilityCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Decode the `capability` field of a chassis node.
///
/// The field may hold one capability object or a list of them. Entries of
/// an unknown type, entries without `enabled`, and non-object entries leave
/// the corresponding flag untouched.
#[must_use]
pub fn decode_capabilities(chassis: &Value) -> CapabilityCode {
    let mut code = CapabilityCode::default();
    let Some(capability) = chassis.get("capability") else {
        return code;
    };

    for entry in OneOrMany::borrowed(capability).into_vec() {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(kind) = entry.get("type").and_then(Value::as_str) else {
            continue;
        };
        let Some(enabled) = entry.get("enabled") else {
            continue;
        };
        if let Some(slot) = code.slot_mut(kind) {
            *slot = if is_truthy(enabled) {
                CapabilityFlag::Enabled
            } else {
                CapabilityFlag::Disabled
            };
        }
    }

    debug!(brws = %code, "Decoded chassis capabilities");
    code
}

/// Boolean reading of an `enabled` value, which `lldpcli` emits as a JSON
/// boolean but other producers emit as 0/1 or strings.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            let text = text.trim();
            !(text.is_empty()
                || text == "0"
                || text.eq_ignore_ascii_case("false")
                || text.eq_ignore_ascii_case("no")
                || text.eq_ignore_ascii_case("off"))
        }
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
