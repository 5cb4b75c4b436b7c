//! LLDP topology discovery for server fleets.
//!
//! This crate connects to servers over SSH, reads `lldpd`'s JSON view of the
//! local chassis, interfaces and neighbors, classifies each interface as a
//! physical function, virtual function or VLAN/other, and assembles one row
//! per interface describing both ends of the link. A companion Redfish walker
//! summarizes BMC hardware inventory.
//!
//! # Example
//!
//! ```rust,ignore
//! use lldp_topo::{render, scan_topology, OutputFormat, ScanOptions, SshConfig, SshExecutor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let executor = SshExecutor::new(SshConfig::default())?;
//!
//!     let rows = scan_topology(&executor, "compute-01", ScanOptions::default()).await?;
//!
//!     print!("{}", render(&rows, OutputFormat::Table)?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;
pub mod catalog;
pub mod connectivity;
pub mod document;
pub mod error;
pub mod interfaces;
pub mod neighbors;
pub mod output;
pub mod redfish;
pub mod topology;
pub mod transport;

pub use capabilities::{decode_capabilities, CapabilityCode, CapabilityFlag};
pub use connectivity::{check_connectivity, ConnectivityReport};
pub use error::{ShapeError, TopoError};
pub use interfaces::{classify_interfaces, InterfaceInfo, InterfaceMap, InterfaceRole, PfDetails};
pub use neighbors::{resolve_neighbors, NeighborMap, NeighborRecord};
pub use output::{render, OutputError, OutputFormat, Tabular};
pub use redfish::{RedfishClient, RedfishConfig, RedfishError, SystemInventory};
pub use topology::{list_interfaces, scan_topology, InterfaceRow, ScanOptions, TopologyRow};
pub use transport::{RemoteExecutionError, RemoteExecutor, SshConfig, SshExecutor};
