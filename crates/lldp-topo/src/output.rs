//! Rendering of report rows as table, CSV, YAML or JSON.

use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;
use thiserror::Error;

use crate::redfish::SystemInventory;
use crate::topology::{InterfaceRow, TopologyRow};

/// Output format of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Yaml,
    Json,
}

/// Errors raised while rendering a report.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A report row with a fixed set of columns.
///
/// The serde field names of implementors must match [`Tabular::HEADERS`] so
/// that YAML/JSON output is keyed like the table columns.
pub trait Tabular: Serialize {
    /// Column headers, in order.
    const HEADERS: &'static [&'static str];

    /// Cell texts, aligned with [`Tabular::HEADERS`].
    fn cells(&self) -> Vec<String>;
}

impl Tabular for TopologyRow {
    const HEADERS: &'static [&'static str] = &[
        "Edge 1",
        "ChassisID 1",
        "BRWS 1",
        "Iface 1",
        "Iface 1 Type",
        "Iface 1 Extra",
        "MAC 1",
        "Edge 2",
        "ChassisID 2",
        "BRWS 2",
        "Iface 2",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.local_chassis.clone(),
            self.local_chassis_id.clone(),
            self.local_capabilities.to_string(),
            self.local_interface.clone(),
            self.local_role.to_string(),
            self.local_extra.clone(),
            self.local_port.clone(),
            self.remote_chassis.clone().unwrap_or_default(),
            self.remote_chassis_id.clone().unwrap_or_default(),
            self.remote_capabilities
                .map(|code| code.to_string())
                .unwrap_or_default(),
            self.remote_port.clone().unwrap_or_default(),
        ]
    }
}

impl Tabular for InterfaceRow {
    const HEADERS: &'static [&'static str] = &[
        "Server",
        "Iface",
        "Type",
        "Device ID",
        "Device Name",
        "Vendor ID",
        "Vendor Name",
        "Numa ID",
        "Speed",
        "Oper State",
        "Num VFs",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.server.clone(),
            self.interface.clone(),
            self.role.to_string(),
            self.device_id.clone(),
            self.device_name.clone(),
            self.vendor_id.clone(),
            self.vendor_name.clone(),
            self.numa_id.clone(),
            self.speed.clone(),
            self.operstate.clone(),
            self.numvfs.clone(),
        ]
    }
}

impl Tabular for SystemInventory {
    const HEADERS: &'static [&'static str] = &[
        "System",
        "CPUs",
        "Memory_GiB",
        "Disk_count",
        "Disk_total_GiB",
        "Network_interfaces",
        "System_path",
    ];

    fn cells(&self) -> Vec<String> {
        let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        vec![
            self.system.clone(),
            self.cpus.to_string(),
            optional(self.memory_gib),
            self.disk_count.to_string(),
            optional(self.disk_total_gib),
            self.network_interfaces.to_string(),
            self.system_path.clone(),
        ]
    }
}

/// Render `rows` in `format`.
///
/// # Errors
///
/// Returns an error if YAML or JSON serialization fails.
pub fn render<T: Tabular>(rows: &[T], format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Table => Ok(format!("{}\n", table(rows))),
        OutputFormat::Csv => Ok(csv(rows)),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(rows)?),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(rows)?)),
    }
}

fn table<T: Tabular>(rows: &[T]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::HEADERS.iter().map(Cell::new));
    for row in rows {
        table.add_row(row.cells());
    }
    table
}

fn csv<T: Tabular>(rows: &[T]) -> String {
    let mut out = T::HEADERS.join(";");
    out.push('\n');
    for row in rows {
        out.push_str(&row.cells().join(";"));
        out.push('\n');
    }
    out
}
