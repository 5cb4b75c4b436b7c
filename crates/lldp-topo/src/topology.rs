//! Per-server topology assembly.
//!
//! A scan is linear: fetch the three `lldpcli` documents in one batch,
//! resolve the local chassis and the neighbor map, then walk the locally
//! reported interfaces, classify each one and emit a [`TopologyRow`] for
//! every physical function.

use serde::Serialize;
use tracing::{debug, info};

use crate::capabilities::{decode_capabilities, CapabilityCode};
use crate::document::{
    self, nested_text, sole_entry, LinkEntry, LldpDocument, LocalChassisDocument,
};
use crate::error::{ShapeError, TopoError};
use crate::interfaces::{classify_interfaces, InterfaceRole};
use crate::neighbors::{resolve_neighbors, UNKNOWN};
use crate::transport::{run_batch_checked, RemoteExecutor};

/// Local chassis information.
pub const CHASSIS_COMMAND: &str = "lldpcli -f json show chassis details";
/// Locally reported LLDP interfaces.
pub const INTERFACES_COMMAND: &str = "lldpcli -f json show interfaces details";
/// LLDP neighbors.
pub const NEIGHBORS_COMMAND: &str = "lldpcli -f json show neighbors details";
/// Kernel link list.
pub const LINK_LIST_COMMAND: &str = "ip -j link list";

/// Enrichment column value when enrichment was not requested.
pub const NOT_REQUESTED: &str = "N/A";

/// Options of a topology scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Only report interfaces that have an LLDP neighbor.
    pub quick: bool,
    /// Add vendor/device/speed details of each physical function.
    pub extra: bool,
}

impl ScanOptions {
    /// Report only interfaces with a neighbor.
    #[must_use]
    pub fn with_quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Request hardware details of physical functions.
    #[must_use]
    pub fn with_extra(mut self, extra: bool) -> Self {
        self.extra = extra;
        self
    }
}

/// One physical link, seen from the local end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyRow {
    #[serde(rename = "Edge 1")]
    pub local_chassis: String,
    #[serde(rename = "ChassisID 1")]
    pub local_chassis_id: String,
    #[serde(rename = "BRWS 1")]
    pub local_capabilities: CapabilityCode,
    #[serde(rename = "Iface 1")]
    pub local_interface: String,
    #[serde(rename = "Iface 1 Type")]
    pub local_role: InterfaceRole,
    #[serde(rename = "Iface 1 Extra")]
    pub local_extra: String,
    #[serde(rename = "MAC 1")]
    pub local_port: String,
    #[serde(rename = "Edge 2")]
    pub remote_chassis: Option<String>,
    #[serde(rename = "ChassisID 2")]
    pub remote_chassis_id: Option<String>,
    #[serde(rename = "BRWS 2")]
    pub remote_capabilities: Option<CapabilityCode>,
    #[serde(rename = "Iface 2")]
    pub remote_port: Option<String>,
}

/// A physical function and its hardware details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceRow {
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "Iface")]
    pub interface: String,
    #[serde(rename = "Type")]
    pub role: InterfaceRole,
    #[serde(rename = "Device ID")]
    pub device_id: String,
    #[serde(rename = "Device Name")]
    pub device_name: String,
    #[serde(rename = "Vendor ID")]
    pub vendor_id: String,
    #[serde(rename = "Vendor Name")]
    pub vendor_name: String,
    #[serde(rename = "Numa ID")]
    pub numa_id: String,
    #[serde(rename = "Speed")]
    pub speed: String,
    #[serde(rename = "Oper State")]
    pub operstate: String,
    #[serde(rename = "Num VFs")]
    pub numvfs: String,
}

/// The local chassis of a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalChassis {
    pub name: String,
    pub id: String,
    pub capabilities: CapabilityCode,
}

/// Raw `lldpcli` documents of one server.
#[derive(Debug, Clone, Default)]
pub struct LldpDocuments {
    pub chassis: LocalChassisDocument,
    pub interfaces: LldpDocument,
    pub neighbors: LldpDocument,
}

/// Fetch and parse the chassis, interface and neighbor documents.
///
/// # Errors
///
/// Fails if the batch fails remotely, returns too few answers, or any
/// answer is not the expected JSON.
pub async fn fetch_lldp_documents(
    executor: &dyn RemoteExecutor,
    server: &str,
) -> Result<LldpDocuments, TopoError> {
    let commands: Vec<String> = [CHASSIS_COMMAND, INTERFACES_COMMAND, NEIGHBORS_COMMAND]
        .iter()
        .map(ToString::to_string)
        .collect();
    for command in &commands {
        info!(server = %server, command = %command, "LLDP command");
    }
    let answers = run_batch_checked(executor, server, &commands).await?;

    let answer = |index: usize| {
        answers
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| TopoError::MissingAnswer {
                server: server.to_string(),
                command: commands[index].clone(),
                index,
                received: answers.len(),
            })
    };
    let parse_failed = |command: &str| {
        let command = command.to_string();
        move |source: ShapeError| TopoError::malformed(server, &command, source)
    };

    let documents = LldpDocuments {
        chassis: document::parse(answer(0)?).map_err(parse_failed(CHASSIS_COMMAND))?,
        interfaces: document::parse(answer(1)?).map_err(parse_failed(INTERFACES_COMMAND))?,
        neighbors: document::parse(answer(2)?).map_err(parse_failed(NEIGHBORS_COMMAND))?,
    };
    debug!(server = %server, documents = ?documents, "Fetched LLDP documents");
    Ok(documents)
}

/// Extract the single local chassis.
///
/// # Errors
///
/// Returns [`ShapeError::LocalChassis`] unless exactly one chassis is listed.
pub fn local_chassis(document: &LocalChassisDocument) -> Result<LocalChassis, ShapeError> {
    let (name, node) = sole_entry(&document.local_chassis.chassis)
        .map_err(|keys| ShapeError::LocalChassis { keys })?;
    Ok(LocalChassis {
        name: name.to_string(),
        id: nested_text(node, &["id", "value"]).unwrap_or_else(|| UNKNOWN.to_string()),
        capabilities: decode_capabilities(node),
    })
}

/// Build the topology rows of one server.
///
/// # Errors
///
/// Any remote failure or malformed document aborts the scan of `server`.
pub async fn scan_topology(
    executor: &dyn RemoteExecutor,
    server: &str,
    options: ScanOptions,
) -> Result<Vec<TopologyRow>, TopoError> {
    info!(server = %server, "Scanning topology");
    let documents = fetch_lldp_documents(executor, server).await?;

    let local = local_chassis(&documents.chassis)
        .map_err(|source| TopoError::malformed(server, CHASSIS_COMMAND, source))?;
    let neighbors = resolve_neighbors(&documents.neighbors)
        .map_err(|source| TopoError::malformed(server, NEIGHBORS_COMMAND, source))?;

    let mut rows = Vec::new();
    for entry in documents.interfaces.interfaces() {
        let (interface, details) = sole_entry(entry).map_err(|keys| {
            TopoError::malformed(server, INTERFACES_COMMAND, ShapeError::InterfaceEntry { keys })
        })?;
        let local_port = nested_text(details, &["port", "id", "value"]).unwrap_or_default();

        let neighbor = neighbors.get(interface);
        debug!(server = %server, interface = %interface, neighbor = ?neighbor, "Neighbor lookup");
        if options.quick && neighbor.is_none() {
            continue;
        }

        let classified =
            classify_interfaces(executor, server, &[interface.to_string()], options.extra).await?;
        let Some(info) = classified.get(interface) else {
            continue;
        };
        info!(server = %server, interface = %interface, role = %info.role, "Interface classified");
        if !info.is_physical() {
            continue;
        }

        let local_extra = if options.extra {
            info.summary.clone().unwrap_or_else(|| NOT_REQUESTED.to_string())
        } else {
            NOT_REQUESTED.to_string()
        };

        let row = TopologyRow {
            local_chassis: local.name.clone(),
            local_chassis_id: local.id.clone(),
            local_capabilities: local.capabilities,
            local_interface: interface.to_string(),
            local_role: info.role,
            local_extra,
            local_port,
            remote_chassis: neighbor.map(|n| n.chassis.clone()),
            remote_chassis_id: neighbor.map(|n| n.chassis_id.clone()),
            remote_capabilities: neighbor.map(|n| n.capabilities),
            remote_port: neighbor.map(|n| n.port.clone()),
        };
        info!(server = %server, row = ?row, "New row");
        rows.push(row);
    }

    info!(server = %server, rows = rows.len(), "Topology scan complete");
    Ok(rows)
}

/// List the physical functions of one server with their hardware details.
///
/// # Errors
///
/// Any remote failure or malformed document aborts the scan of `server`.
pub async fn list_interfaces(
    executor: &dyn RemoteExecutor,
    server: &str,
) -> Result<Vec<InterfaceRow>, TopoError> {
    info!(server = %server, "Listing interfaces");
    let commands = vec![LINK_LIST_COMMAND.to_string()];
    let answers = run_batch_checked(executor, server, &commands).await?;
    let output = answers.first().ok_or_else(|| TopoError::MissingAnswer {
        server: server.to_string(),
        command: LINK_LIST_COMMAND.to_string(),
        index: 0,
        received: 0,
    })?;
    let links: Vec<LinkEntry> = document::parse(output)
        .map_err(|source| TopoError::malformed(server, LINK_LIST_COMMAND, source))?;

    let names: Vec<String> = links.into_iter().map(|link| link.ifname).collect();
    let classified = classify_interfaces(executor, server, &names, true).await?;

    let rows: Vec<InterfaceRow> = classified
        .into_iter()
        .filter_map(|(interface, info)| {
            let details = info.details.filter(|_| info.role == InterfaceRole::PhysicalFunction)?;
            Some(InterfaceRow {
                server: server.to_string(),
                interface,
                role: info.role,
                device_id: details.device_id,
                device_name: details.device_name,
                vendor_id: details.vendor_id,
                vendor_name: details.vendor_name,
                numa_id: details.numa_id,
                speed: details.speed,
                operstate: details.operstate,
                numvfs: details.numvfs,
            })
        })
        .collect();

    debug!(server = %server, rows = ?rows, "Interface rows");
    Ok(rows)
}
