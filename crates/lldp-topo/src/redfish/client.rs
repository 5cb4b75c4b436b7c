//! Redfish HTTP client and inventory walk.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

use super::models::{
    as_f64, as_u64, gib, Chassis, Collection, ComputerSystem, Drive, Link, MemoryModule,
    ServiceRoot, Storage, SystemInventory, TypedResource,
};
use super::{RedfishConfig, RedfishError};

/// Redfish service root path.
pub const SERVICE_ROOT: &str = "/redfish/v1/";

/// Chassis collection, searched for drives not linked from the system.
const CHASSIS_COLLECTION: &str = "/redfish/v1/Chassis";

/// Read-only Redfish client.
#[derive(Clone)]
pub struct RedfishClient {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl RedfishClient {
    /// Create a client for the service at `config.base_url`.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: &RedfishConfig) -> Result<Self, RedfishError> {
        let base = Url::parse(&config.base_url).map_err(|source| RedfishError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            client,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Resolve an absolute or base-relative path.
    fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        if path.starts_with("http") {
            Url::parse(path)
        } else {
            self.base.join(path)
        }
    }

    /// GET `path` and decode it. Any failure is logged and yields `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = match self.resolve(path) {
            Ok(url) => url,
            Err(e) => {
                warn!(path = %path, error = %e, "Invalid Redfish path");
                return None;
            }
        };

        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let body = match response {
            Ok(response) => response.text().await,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed GET");
                return None;
            }
        };

        let text = match body {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed reading response body");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => {
                debug!(url = %url, body = %text, "GET succeeded");
                Some(value)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to parse response");
                None
            }
        }
    }

    async fn members(&self, link: Option<&Link>) -> Option<Vec<Link>> {
        let path = link?.odata_id.as_deref()?;
        self.get_json::<Collection>(path).await?.members
    }

    /// Summarize every system the service exposes.
    ///
    /// # Errors
    /// Returns [`RedfishError::ServiceUnavailable`] if the service root or the
    /// systems collection cannot be read.
    pub async fn inventory(&self) -> Result<Vec<SystemInventory>, RedfishError> {
        info!(base = %self.base, "Connecting to Redfish service");
        let Some(root) = self.get_json::<ServiceRoot>(SERVICE_ROOT).await else {
            error!(path = SERVICE_ROOT, "Failed to retrieve service root");
            return Err(RedfishError::ServiceUnavailable(format!(
                "cannot read {SERVICE_ROOT}"
            )));
        };

        let default_systems = format!("{SERVICE_ROOT}Systems");
        let systems_path = root
            .systems
            .as_ref()
            .and_then(|l| l.odata_id.clone())
            .unwrap_or(default_systems);

        info!(path = %systems_path, "Retrieving systems");
        let Some(members) = self
            .get_json::<Collection>(&systems_path)
            .await
            .and_then(|c| c.members)
        else {
            error!(path = %systems_path, "Systems not found in Redfish service");
            return Err(RedfishError::ServiceUnavailable(format!(
                "no systems collection at {systems_path}"
            )));
        };

        let mut results = Vec::new();
        for member in members {
            let Some(path) = member.odata_id else {
                continue;
            };
            let Some(system) = self.get_json::<ComputerSystem>(&path).await else {
                continue;
            };
            let name = system
                .name
                .clone()
                .or_else(|| system.id.clone())
                .unwrap_or_else(|| path.clone());

            let cpus = self.count_processors(&system).await;
            let memory_gib = self.count_memory(&system).await;
            let (disk_count, disk_total_gib) = self.count_disks(&system).await;
            let network_interfaces = self.count_interfaces(&system).await;

            info!(system = %name, cpus, disk_count, network_interfaces, "System inventoried");
            results.push(SystemInventory {
                system: name,
                cpus,
                memory_gib,
                disk_count,
                disk_total_gib,
                network_interfaces,
                system_path: path,
            });
        }

        Ok(results)
    }

    async fn count_processors(&self, system: &ComputerSystem) -> u64 {
        info!("Counting processors");
        if let Some(count) = system.processor_summary.as_ref().and_then(|s| s.count.as_ref()) {
            return as_u64(count);
        }
        if let Some(members) = self.members(system.processors.as_ref()).await {
            return members.len() as u64;
        }
        self.search_for_type(system, "Processor").await.unwrap_or(0)
    }

    /// Count resources linked from `system` whose type or name mentions
    /// `keyword`. `None` when nothing matched.
    async fn search_for_type(&self, system: &ComputerSystem, keyword: &str) -> Option<u64> {
        let mut checked = HashSet::new();
        let mut found = 0u64;

        for path in system.search_paths() {
            let Some(members) = self.get_json::<Collection>(path).await.and_then(|c| c.members)
            else {
                continue;
            };
            for member in members {
                let Some(member_path) = member.odata_id else {
                    continue;
                };
                if !checked.insert(member_path.clone()) {
                    continue;
                }
                if let Some(resource) = self.get_json::<TypedResource>(&member_path).await {
                    if resource.matches(keyword) {
                        found += 1;
                    }
                }
            }
        }

        (found > 0).then_some(found)
    }

    async fn count_memory(&self, system: &ComputerSystem) -> Option<f64> {
        info!("Counting memory");
        if let Some(total) = system
            .memory_summary
            .as_ref()
            .and_then(|s| s.total_system_memory_gib.as_ref())
            .and_then(as_f64)
        {
            return Some(total);
        }

        let mut total_bytes = 0u64;
        for member in self.members(system.memory.as_ref()).await.unwrap_or_default() {
            let Some(path) = member.odata_id.as_deref() else {
                continue;
            };
            if let Some(module) = self.get_json::<MemoryModule>(path).await {
                total_bytes = total_bytes.saturating_add(module.bytes());
            }
        }

        (total_bytes > 0).then(|| gib(total_bytes))
    }

    async fn count_disks(&self, system: &ComputerSystem) -> (usize, Option<f64>) {
        info!("Counting disks");
        let mut tally = DriveTally::default();

        for member in self.members(system.storage.as_ref()).await.unwrap_or_default() {
            let Some(path) = member.odata_id.as_deref() else {
                continue;
            };
            let Some(storage) = self.get_json::<Storage>(path).await else {
                continue;
            };
            for drive in storage.drives.unwrap_or_default() {
                let Some(drive_path) = drive.odata_id.as_deref() else {
                    continue;
                };
                match self.get_json::<Drive>(drive_path).await {
                    Some(Drive {
                        members: Some(members),
                        ..
                    }) => self.add_drives(&mut tally, &members).await,
                    Some(resource) => tally.add(&drive, Some(&resource)),
                    None => {}
                }
            }
        }

        let chassis = self
            .get_json::<Collection>(CHASSIS_COLLECTION)
            .await
            .and_then(|c| c.members)
            .unwrap_or_default();
        for member in chassis {
            let Some(path) = member.odata_id.as_deref() else {
                continue;
            };
            let Some(chassis) = self.get_json::<Chassis>(path).await else {
                continue;
            };
            if let Some(drives) = self.members(chassis.drives.as_ref()).await {
                self.add_drives(&mut tally, &drives).await;
            }
        }

        (tally.seen.len(), (tally.bytes > 0).then(|| gib(tally.bytes)))
    }

    async fn add_drives(&self, tally: &mut DriveTally, drives: &[Link]) {
        for drive in drives {
            if tally.contains(drive) {
                continue;
            }
            let resource = match drive.odata_id.as_deref() {
                Some(path) => self.get_json::<Drive>(path).await,
                None => None,
            };
            tally.add(drive, resource.as_ref());
        }
    }

    async fn count_interfaces(&self, system: &ComputerSystem) -> usize {
        info!("Counting network interfaces");
        let mut seen = Vec::<String>::new();
        for link in [&system.ethernet_interfaces, &system.network_interfaces] {
            for member in self.members(link.as_ref()).await.unwrap_or_default() {
                let key = member_key(&member);
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
        }
        seen.len()
    }
}

/// Drives counted so far, de-duplicated by identity.
#[derive(Default)]
struct DriveTally {
    seen: HashSet<String>,
    bytes: u64,
}

impl DriveTally {
    fn contains(&self, drive: &Link) -> bool {
        self.seen.contains(&member_key(drive))
    }

    fn add(&mut self, drive: &Link, resource: Option<&Drive>) {
        if self.seen.insert(member_key(drive)) {
            self.bytes = self
                .bytes
                .saturating_add(resource.map_or(0, Drive::bytes));
        }
    }
}

fn member_key(link: &Link) -> String {
    link.key().map_or_else(|| format!("{link:?}"), str::to_string)
}
