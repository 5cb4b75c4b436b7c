//! Resolution of `lldpcli show neighbors` output into per-interface records.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::capabilities::{decode_capabilities, CapabilityCode};
use crate::document::{nested_text, sole_entry, LldpDocument};
use crate::error::ShapeError;

/// Placeholder for chassis names and identifiers that were not advertised.
pub const UNKNOWN: &str = "UNKNOWN";

/// What was learned about the remote end of one local interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborRecord {
    /// Remote chassis display name.
    pub chassis: String,
    /// Remote chassis identifier, usually a MAC address.
    pub chassis_id: String,
    /// Remote chassis BRWS code.
    pub capabilities: CapabilityCode,
    /// Remote port identifier; empty if not advertised.
    pub port: String,
}

/// Neighbor records keyed by local interface name, in discovery order.
pub type NeighborMap = IndexMap<String, NeighborRecord>;

/// Build the neighbor map of one server.
///
/// A local interface appearing more than once keeps its last record.
///
/// # Errors
///
/// Returns [`ShapeError::NeighborChassis`] if a neighbor's chassis object
/// does not have exactly one key.
pub fn resolve_neighbors(document: &LldpDocument) -> Result<NeighborMap, ShapeError> {
    let mut neighbors = NeighborMap::new();

    for entry in document.interfaces() {
        for (interface, info) in entry {
            let record = resolve_interface(interface, info)?;
            debug!(
                interface = %interface,
                chassis = %record.chassis,
                chassis_id = %record.chassis_id,
                port = %record.port,
                "Resolved neighbor"
            );
            neighbors.insert(interface.clone(), record);
        }
    }

    info!(count = neighbors.len(), "Resolved LLDP neighbors");
    Ok(neighbors)
}

fn resolve_interface(interface: &str, info: &Value) -> Result<NeighborRecord, ShapeError> {
    let empty = Map::new();
    let chassis = info
        .get("chassis")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let (name, node) = sole_entry(chassis).map_err(|keys| ShapeError::NeighborChassis {
        interface: interface.to_string(),
        keys,
    })?;

    let (chassis_name, chassis_id, capabilities) = if name == "id" {
        // The switch did not send a system name, only its chassis id.
        let mac = (node.get("type").and_then(Value::as_str) == Some("mac"))
            .then(|| nested_text(node, &["value"]))
            .flatten()
            .filter(|mac| !mac.is_empty());
        let capabilities = decode_capabilities(&Value::Object(chassis.clone()));
        match mac {
            Some(mac) => (mac.clone(), mac, capabilities),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string(), capabilities),
        }
    } else {
        (
            name.to_string(),
            nested_text(node, &["id", "value"]).unwrap_or_else(|| UNKNOWN.to_string()),
            decode_capabilities(node),
        )
    };

    Ok(NeighborRecord {
        chassis: chassis_name,
        chassis_id,
        capabilities,
        port: nested_text(info, &["port", "id", "value"]).unwrap_or_default(),
    })
}
