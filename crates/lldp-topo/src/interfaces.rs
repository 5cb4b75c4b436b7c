//! Interface role classification and physical-function enrichment.
//!
//! Roles are decided on the remote host from sysfs: an interface backed by
//! a `device/physfn` link is an SR-IOV virtual function, an interface with
//! no `device` directory is a VLAN (or another software device), anything
//! else is a physical function.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::error::TopoError;
use crate::transport::{run_batch_checked, RemoteExecutor};

/// Number of enrichment commands issued per physical function.
pub const ENRICHMENT_FIELDS: usize = 6;

/// Role of a network interface on its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterfaceRole {
    #[serde(rename = "pf")]
    PhysicalFunction,
    #[serde(rename = "vf")]
    VirtualFunction,
    #[serde(rename = "vlan")]
    VlanOrOther,
}

impl InterfaceRole {
    /// Parse the word printed by the role check.
    #[must_use]
    pub fn from_check_answer(answer: &str) -> Option<Self> {
        match answer.trim() {
            "pf" => Some(Self::PhysicalFunction),
            "vf" => Some(Self::VirtualFunction),
            "vlan" => Some(Self::VlanOrOther),
            _ => None,
        }
    }

    /// Short name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PhysicalFunction => "pf",
            Self::VirtualFunction => "vf",
            Self::VlanOrOther => "vlan",
        }
    }
}

impl fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware details of a physical function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PfDetails {
    pub device_id: String,
    pub device_name: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub numa_id: String,
    pub speed: String,
    pub operstate: String,
    pub numvfs: String,
}

impl PfDetails {
    /// Build from the six enrichment answers, in command order.
    fn from_answers(answers: [&str; ENRICHMENT_FIELDS]) -> Self {
        let [device_id, vendor_id, numa_id, speed, operstate, numvfs] =
            answers.map(|answer| answer.trim().to_string());
        let (vendor_name, device_name) = catalog::lookup(&vendor_id, &device_id);
        Self {
            device_name: device_name.to_string(),
            vendor_name: vendor_name.to_string(),
            device_id,
            vendor_id,
            numa_id,
            speed,
            operstate,
            numvfs,
        }
    }

    /// `vendor_name,vendor_id,device_name,device_id,speed,operstate,numvfs`.
    #[must_use]
    pub fn summary(&self) -> String {
        [
            self.vendor_name.as_str(),
            &self.vendor_id,
            &self.device_name,
            &self.device_id,
            &self.speed,
            &self.operstate,
            &self.numvfs,
        ]
        .join(",")
    }
}

/// Classification result for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceInfo {
    pub role: InterfaceRole,
    /// Present only for physical functions when enrichment was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PfDetails>,
    /// Precomputed [`PfDetails::summary`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl InterfaceInfo {
    fn new(role: InterfaceRole) -> Self {
        Self {
            role,
            details: None,
            summary: None,
        }
    }

    fn enrich(&mut self, details: PfDetails) {
        self.summary = Some(details.summary());
        self.details = Some(details);
    }

    /// Whether the interface is a physical function.
    #[must_use]
    pub fn is_physical(&self) -> bool {
        self.role == InterfaceRole::PhysicalFunction
    }
}

/// Interface information keyed by name, in the order interfaces were given.
pub type InterfaceMap = IndexMap<String, InterfaceInfo>;

/// Shell snippet printing `pf`, `vf` or `vlan` for `interface`.
#[must_use]
pub fn role_check_command(interface: &str) -> String {
    format!(
        "iface_type=\"pf\"; [ -d \"/sys/class/net/{interface}/device/physfn\" ] \
         && iface_type=\"vf\"; [ ! -d \"/sys/class/net/{interface}/device\" ] \
         && iface_type=\"vlan\"; echo $iface_type"
    )
}

/// Commands reading device id, vendor id, NUMA node, speed, operstate and
/// VF count of `interface`, in that order.
#[must_use]
pub fn enrichment_commands(interface: &str) -> [String; ENRICHMENT_FIELDS] {
    [
        format!("cat /sys/class/net/{interface}/device/device"),
        format!("cat /sys/class/net/{interface}/device/vendor"),
        format!("cat /sys/class/net/{interface}/device/numa_node"),
        format!("cat /sys/class/net/{interface}/speed || echo UNKNOWN SPEED"),
        format!("cat /sys/class/net/{interface}/operstate || echo UNKNOWN OPERSTATE"),
        format!("cat /sys/class/net/{interface}/device/sriov_numvfs || echo UNKNOWN NUMVFS"),
    ]
}

/// Classify `interfaces` on `server`, optionally enriching physical
/// functions with hardware details.
///
/// All role checks run as one batch; enrichment runs as a second batch over
/// the physical functions only.
///
/// # Errors
///
/// Fails if either batch fails remotely, or if the remote side returned
/// fewer answers than a lookup needs.
pub async fn classify_interfaces(
    executor: &dyn RemoteExecutor,
    server: &str,
    interfaces: &[String],
    want_enrichment: bool,
) -> Result<InterfaceMap, TopoError> {
    let commands: Vec<String> = interfaces.iter().map(|i| role_check_command(i)).collect();
    debug!(server = %server, commands = ?commands, "Probing interface roles");
    let answers = run_batch_checked(executor, server, &commands).await?;

    let mut classified = InterfaceMap::with_capacity(interfaces.len());
    for (index, interface) in interfaces.iter().enumerate() {
        let answer = answer_at(&answers, index, server, &commands)?;
        let role = InterfaceRole::from_check_answer(answer).unwrap_or_else(|| {
            warn!(
                server = %server,
                interface = %interface,
                answer = %answer,
                "Unrecognized role check answer, treating interface as non-physical"
            );
            InterfaceRole::VlanOrOther
        });
        classified.insert(interface.clone(), InterfaceInfo::new(role));
    }

    if want_enrichment {
        let physical: Vec<String> = classified
            .iter()
            .filter(|(_, info)| info.is_physical())
            .map(|(name, _)| name.clone())
            .collect();
        if !physical.is_empty() {
            enrich_physical(executor, server, &physical, &mut classified).await?;
        }
    }

    info!(
        server = %server,
        interfaces = classified.len(),
        physical = classified.values().filter(|info| info.is_physical()).count(),
        "Classified interfaces"
    );
    Ok(classified)
}

async fn enrich_physical(
    executor: &dyn RemoteExecutor,
    server: &str,
    physical: &[String],
    classified: &mut InterfaceMap,
) -> Result<(), TopoError> {
    let commands: Vec<String> = physical
        .iter()
        .flat_map(|interface| enrichment_commands(interface))
        .collect();
    let answers = run_batch_checked(executor, server, &commands).await?;

    for (position, interface) in physical.iter().enumerate() {
        let base = position * ENRICHMENT_FIELDS;
        let mut chunk = [""; ENRICHMENT_FIELDS];
        for (offset, slot) in chunk.iter_mut().enumerate() {
            *slot = answer_at(&answers, base + offset, server, &commands)?;
        }

        let details = PfDetails::from_answers(chunk);
        debug!(server = %server, interface = %interface, details = ?details, "Enriched interface");
        if let Some(info) = classified.get_mut(interface) {
            info.enrich(details);
        }
    }
    Ok(())
}

fn answer_at<'a>(
    answers: &'a [String],
    index: usize,
    server: &str,
    commands: &[String],
) -> Result<&'a str, TopoError> {
    answers
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| TopoError::MissingAnswer {
            server: server.to_string(),
            command: commands.get(index).cloned().unwrap_or_default(),
            index,
            received: answers.len(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tracing_test::traced_test;

    use super::*;
    use crate::transport::RemoteExecutionError;

    /// Answers commands from a table; unknown commands print nothing.
    #[derive(Default)]
    pub(crate) struct ScriptedExecutor {
        pub answers: HashMap<String, String>,
        pub failing: Option<String>,
        pub truncate_to: Option<usize>,
        pub batches: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedExecutor {
        pub fn answer(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
            self.answers.insert(command.into(), output.into());
            self
        }

        pub fn role(self, interface: &str, role: &str) -> Self {
            self.answer(role_check_command(interface), role)
        }

        pub fn details(self, interface: &str, values: [&str; ENRICHMENT_FIELDS]) -> Self {
            enrichment_commands(interface)
                .into_iter()
                .zip(values)
                .fold(self, |executor, (command, value)| {
                    executor.answer(command, value)
                })
        }

        pub fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteExecutor for ScriptedExecutor {
        async fn run_one(
            &self,
            server: &str,
            command: &str,
        ) -> Result<String, RemoteExecutionError> {
            if self.failing.as_deref() == Some(command) {
                return Err(RemoteExecutionError::NonZeroExit {
                    server: server.to_string(),
                    command: command.to_string(),
                    exit_code: Some(1),
                    stderr: "scripted failure".to_string(),
                });
            }
            Ok(self.answers.get(command).cloned().unwrap_or_default())
        }

        async fn run_batch(
            &self,
            server: &str,
            commands: &[String],
        ) -> Result<Vec<String>, RemoteExecutionError> {
            self.batches.lock().unwrap().push(commands.to_vec());
            let mut outputs = Vec::with_capacity(commands.len());
            for command in commands {
                outputs.push(self.run_one(server, command).await?.trim().to_string());
            }
            if let Some(limit) = self.truncate_to {
                outputs.truncate(limit);
            }
            Ok(outputs)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_role_check_command() {
        assert_eq!(
            role_check_command("eth0"),
            "iface_type=\"pf\"; [ -d \"/sys/class/net/eth0/device/physfn\" ] && \
             iface_type=\"vf\"; [ ! -d \"/sys/class/net/eth0/device\" ] && \
             iface_type=\"vlan\"; echo $iface_type"
        );
    }

    #[test]
    fn test_enrichment_commands() {
        let commands = enrichment_commands("eth0");
        assert!(commands.iter().all(|cmd| cmd.contains("/sys/class/net/eth0/")));
        assert_eq!(commands[0], "cat /sys/class/net/eth0/device/device");
        assert_eq!(
            commands[5],
            "cat /sys/class/net/eth0/device/sriov_numvfs || echo UNKNOWN NUMVFS"
        );
    }

    #[test]
    fn test_role_from_check_answer() {
        assert_eq!(
            InterfaceRole::from_check_answer("pf\n"),
            Some(InterfaceRole::PhysicalFunction)
        );
        assert_eq!(
            InterfaceRole::from_check_answer("vf"),
            Some(InterfaceRole::VirtualFunction)
        );
        assert_eq!(InterfaceRole::from_check_answer("vlan"), Some(InterfaceRole::VlanOrOther));
        assert_eq!(InterfaceRole::from_check_answer(""), None);
    }

    #[tokio::test]
    async fn test_classify_without_enrichment() {
        let executor = ScriptedExecutor::default()
            .role("eno1", "pf")
            .role("eno1v0", "vf")
            .role("bond0.100", "vlan");
        let interfaces = names(&["eno1", "eno1v0", "bond0.100"]);

        let classified = classify_interfaces(&executor, "node1", &interfaces, false)
            .await
            .unwrap();

        assert_eq!(
            classified.keys().cloned().collect::<Vec<_>>(),
            interfaces
        );
        assert_eq!(classified["eno1"].role, InterfaceRole::PhysicalFunction);
        assert_eq!(classified["eno1v0"].role, InterfaceRole::VirtualFunction);
        assert_eq!(classified["bond0.100"].role, InterfaceRole::VlanOrOther);
        assert!(classified.values().all(|info| info.details.is_none()));
        assert_eq!(executor.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_only_for_physical_functions() {
        let executor = ScriptedExecutor::default()
            .role("ens1f0", "pf")
            .role("ens1f0v1", "vf")
            .role("ens2f0", "pf")
            .details(
                "ens1f0",
                ["0x158b", "0x8086", "0", "25000", "up", "8"],
            )
            .details(
                "ens2f0",
                ["0x1019", "0x15b3", "1", "UNKNOWN SPEED", "down", "UNKNOWN NUMVFS"],
            );
        let interfaces = names(&["ens1f0", "ens1f0v1", "ens2f0"]);

        let classified = classify_interfaces(&executor, "node1", &interfaces, true)
            .await
            .unwrap();

        let batches = executor.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 2 * ENRICHMENT_FIELDS);
        assert!(batches[1].iter().all(|cmd| !cmd.contains("ens1f0v1")));

        let first = classified["ens1f0"].details.as_ref().unwrap();
        assert_eq!(first.vendor_name, "Intel");
        assert_eq!(first.device_name, "Fortville XXV710 for 25GbE SFP28");
        assert_eq!(first.numa_id, "0");
        assert_eq!(first.numvfs, "8");

        let second = classified["ens2f0"].details.as_ref().unwrap();
        assert_eq!(second.vendor_name, "Mellanox");
        assert_eq!(second.speed, "UNKNOWN SPEED");
        assert!(classified["ens1f0v1"].details.is_none());
    }

    #[tokio::test]
    async fn test_summary_has_seven_fields_in_order() {
        let executor = ScriptedExecutor::default()
            .role("eth0", "pf")
            .details("eth0", ["0x10fb", "0x8086", "0", "10000", "up", "0"]);

        let classified = classify_interfaces(&executor, "node1", &names(&["eth0"]), true)
            .await
            .unwrap();

        let summary = classified["eth0"].summary.clone().unwrap();
        let fields: Vec<&str> = summary.split(',').collect();
        assert_eq!(
            fields,
            vec![
                "Intel",
                "0x8086",
                "Niantic IXGBE 82599 SFP",
                "0x10fb",
                "10000",
                "up",
                "0"
            ]
        );
    }

    #[tokio::test]
    async fn test_role_check_failure_is_fatal() {
        let executor = ScriptedExecutor {
            failing: Some(role_check_command("eth0")),
            ..ScriptedExecutor::default()
        };
        let err = classify_interfaces(&executor, "node1", &names(&["eth0"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::Remote(_)));
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_fatal() {
        let executor = ScriptedExecutor {
            failing: Some(enrichment_commands("eth0")[2].clone()),
            ..ScriptedExecutor::default()
        }
        .role("eth0", "pf");
        let err = classify_interfaces(&executor, "node1", &names(&["eth0"]), true)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::Remote(_)));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_short_answers_fail_only_when_read() {
        let executor = ScriptedExecutor {
            truncate_to: Some(1),
            ..ScriptedExecutor::default()
        }
        .role("eth0", "vlan")
        .role("eth1", "pf");

        let one = classify_interfaces(&executor, "node1", &names(&["eth0"]), false).await;
        assert!(one.is_ok());
        assert!(!logs_contain("does not match length of answers"));

        let err = classify_interfaces(&executor, "node1", &names(&["eth0", "eth1"]), false)
            .await
            .unwrap_err();
        match err {
            TopoError::MissingAnswer {
                index, received, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(received, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unrecognized_role_answer_is_not_physical() {
        let executor = ScriptedExecutor::default().role("eth0", "sh: syntax error");
        let classified = classify_interfaces(&executor, "node1", &names(&["eth0"]), true)
            .await
            .unwrap();
        assert_eq!(classified["eth0"].role, InterfaceRole::VlanOrOther);
        assert_eq!(executor.batches().len(), 1);
        assert!(logs_contain("Unrecognized role check answer"));
    }
}
