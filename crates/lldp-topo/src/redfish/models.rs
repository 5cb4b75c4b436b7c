//! Redfish resource models.
//!
//! Only the properties the inventory walk reads are modelled. Everything is
//! optional because BMC vendors differ in what they populate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Links and collections
// ============================================================================

/// A reference to another resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(rename = "@odata.id")]
    pub odata_id: Option<String>,
    #[serde(rename = "Id")]
    pub id: Option<String>,
}

impl Link {
    /// Identity used to de-duplicate members.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.odata_id.as_deref().or(self.id.as_deref())
    }
}

/// Any resource collection.
#[derive(Debug, Default, Deserialize)]
pub struct Collection {
    #[serde(rename = "Members")]
    pub members: Option<Vec<Link>>,
}

// ============================================================================
// Service root and systems
// ============================================================================

/// `/redfish/v1/`.
#[derive(Debug, Deserialize)]
pub struct ServiceRoot {
    #[serde(rename = "Systems")]
    pub systems: Option<Link>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessorSummary {
    #[serde(rename = "Count")]
    pub count: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemorySummary {
    #[serde(rename = "TotalSystemMemoryGiB")]
    pub total_system_memory_gib: Option<Value>,
}

/// A `ComputerSystem` resource.
#[derive(Debug, Default, Deserialize)]
pub struct ComputerSystem {
    #[serde(rename = "@odata.id")]
    pub odata_id: Option<String>,
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "ProcessorSummary")]
    pub processor_summary: Option<ProcessorSummary>,
    #[serde(rename = "MemorySummary")]
    pub memory_summary: Option<MemorySummary>,
    #[serde(rename = "Processors")]
    pub processors: Option<Link>,
    #[serde(rename = "Memory")]
    pub memory: Option<Link>,
    #[serde(rename = "Storage")]
    pub storage: Option<Link>,
    #[serde(rename = "EthernetInterfaces")]
    pub ethernet_interfaces: Option<Link>,
    #[serde(rename = "NetworkInterfaces")]
    pub network_interfaces: Option<Link>,
}

impl ComputerSystem {
    /// Collection links searched when nothing else reports a CPU count.
    pub(crate) fn search_paths(&self) -> Vec<&str> {
        [
            &self.processors,
            &self.memory,
            &self.ethernet_interfaces,
            &self.network_interfaces,
            &self.storage,
        ]
        .into_iter()
        .filter_map(|link| link.as_ref().and_then(|l| l.odata_id.as_deref()))
        .chain(self.odata_id.as_deref())
        .filter(|path| !path.is_empty())
        .collect()
    }
}

// ============================================================================
// Hardware resources
// ============================================================================

/// A memory module.
#[derive(Debug, Default, Deserialize)]
pub struct MemoryModule {
    #[serde(rename = "CapacityMiB")]
    pub capacity_mib: Option<Value>,
    #[serde(rename = "CapacityBytes")]
    pub capacity_bytes: Option<Value>,
    #[serde(rename = "CapacityKB")]
    pub capacity_kb: Option<Value>,
}

impl MemoryModule {
    /// Module size in bytes, preferring MiB, then bytes, then KB.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        if let Some(mib) = &self.capacity_mib {
            as_u64(mib).saturating_mul(1 << 20)
        } else if let Some(bytes) = &self.capacity_bytes {
            as_u64(bytes)
        } else if let Some(kb) = &self.capacity_kb {
            as_u64(kb).saturating_mul(1 << 10)
        } else {
            0
        }
    }
}

/// A `Storage` resource; `Drives` lists drive links and may be `null`.
#[derive(Debug, Default, Deserialize)]
pub struct Storage {
    #[serde(rename = "Drives")]
    pub drives: Option<Vec<Link>>,
}

/// A `Chassis` resource; `Drives` links a drive collection.
#[derive(Debug, Default, Deserialize)]
pub struct Chassis {
    #[serde(rename = "Drives")]
    pub drives: Option<Link>,
}

/// A drive, or a drive collection when `Members` is present.
#[derive(Debug, Default, Deserialize)]
pub struct Drive {
    #[serde(rename = "Members")]
    pub members: Option<Vec<Link>>,
    #[serde(rename = "CapacityBytes")]
    pub capacity_bytes: Option<Value>,
    #[serde(rename = "CapacityGB")]
    pub capacity_gb: Option<Value>,
}

impl Drive {
    #[must_use]
    pub fn bytes(&self) -> u64 {
        if let Some(bytes) = &self.capacity_bytes {
            as_u64(bytes)
        } else if let Some(gb) = &self.capacity_gb {
            as_u64(gb).saturating_mul(1 << 30)
        } else {
            0
        }
    }
}

/// Just enough of any resource to tell what it is.
#[derive(Debug, Default, Deserialize)]
pub struct TypedResource {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<Value>,
}

impl TypedResource {
    /// Case-insensitive match of `keyword` against the type or the name.
    #[must_use]
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        let name = match &self.name {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        self.odata_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(&keyword)
            || name.to_lowercase().contains(&keyword)
    }
}

// ============================================================================
// Result
// ============================================================================

/// Hardware summary of one system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInventory {
    #[serde(rename = "System")]
    pub system: String,
    #[serde(rename = "CPUs")]
    pub cpus: u64,
    #[serde(rename = "Memory_GiB")]
    pub memory_gib: Option<f64>,
    #[serde(rename = "Disk_count")]
    pub disk_count: usize,
    #[serde(rename = "Disk_total_GiB")]
    pub disk_total_gib: Option<f64>,
    #[serde(rename = "Network_interfaces")]
    pub network_interfaces: usize,
    #[serde(rename = "System_path")]
    pub system_path: String,
}

/// Lenient integer conversion: numbers are truncated, numeric strings are
/// parsed, anything else is 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn as_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Lenient float conversion used for summary fields.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Bytes to GiB, rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gib(bytes: u64) -> f64 {
    let gib = bytes as f64 / f64::from(1u32 << 30);
    (gib * 100.0).round() / 100.0
}
