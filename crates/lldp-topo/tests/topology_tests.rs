//! Integration tests for topology discovery.
//!
//! These tests drive the public API against an in-memory fleet that answers
//! remote commands the way `lldpcli`, `ip` and sysfs would.

use std::collections::HashMap;

use async_trait::async_trait;
use lldp_topo::interfaces::{enrichment_commands, role_check_command};
use lldp_topo::topology::{
    CHASSIS_COMMAND, INTERFACES_COMMAND, LINK_LIST_COMMAND, NEIGHBORS_COMMAND, NOT_REQUESTED,
};
use lldp_topo::{
    list_interfaces, render, scan_topology, InterfaceRole, OutputFormat, RemoteExecutionError,
    RemoteExecutor, ScanOptions, TopoError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// =============================================================================
// In-memory fleet
// =============================================================================

/// Per-server command answers. Unknown commands print nothing.
#[derive(Default)]
struct Fleet {
    servers: HashMap<String, HashMap<String, String>>,
    unreachable: Vec<String>,
}

impl Fleet {
    fn with_server(mut self, name: &str, answers: HashMap<String, String>) -> Self {
        self.servers.insert(name.to_string(), answers);
        self
    }

    fn with_unreachable(mut self, name: &str) -> Self {
        self.unreachable.push(name.to_string());
        self
    }
}

#[async_trait]
impl RemoteExecutor for Fleet {
    async fn run_one(&self, server: &str, command: &str) -> Result<String, RemoteExecutionError> {
        if self.unreachable.iter().any(|s| s == server) {
            return Err(RemoteExecutionError::NonZeroExit {
                server: server.to_string(),
                command: command.to_string(),
                exit_code: Some(255),
                stderr: format!("ssh: connect to host {server} port 22: Connection refused"),
            });
        }
        Ok(self
            .servers
            .get(server)
            .and_then(|answers| answers.get(command))
            .cloned()
            .unwrap_or_default())
    }

    async fn run_batch(
        &self,
        server: &str,
        commands: &[String],
    ) -> Result<Vec<String>, RemoteExecutionError> {
        let mut answers = Vec::with_capacity(commands.len());
        for command in commands {
            answers.push(self.run_one(server, command).await?);
        }
        Ok(answers)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn compute_node() -> HashMap<String, String> {
    let mut answers = HashMap::new();
    answers.insert(
        CHASSIS_COMMAND.to_string(),
        json!({
            "local-chassis": {
                "chassis": {
                    "compute-01": {
                        "id": {"type": "mac", "value": "3c:ec:ef:00:00:01"},
                        "capability": {"type": "Station", "enabled": true}
                    }
                }
            }
        })
        .to_string(),
    );
    answers.insert(
        INTERFACES_COMMAND.to_string(),
        json!({
            "lldp": {
                "interface": [
                    {"eno1": {"port": {"id": {"type": "mac", "value": "3c:ec:ef:00:00:11"}}}},
                    {"eno2": {"port": {"id": {"type": "mac", "value": "3c:ec:ef:00:00:12"}}}},
                    {"eno1v0": {"port": {"id": {"type": "mac", "value": "3c:ec:ef:00:00:21"}}}},
                    {"bond0.100": {"port": {"id": {"type": "mac", "value": "3c:ec:ef:00:00:11"}}}}
                ]
            }
        })
        .to_string(),
    );
    answers.insert(
        NEIGHBORS_COMMAND.to_string(),
        json!({
            "lldp": {
                "interface": [
                    {"eno1": {
                        "chassis": {
                            "leaf-01": {
                                "id": {"type": "mac", "value": "0c:29:ef:c9:46:a0"},
                                "capability": [
                                    {"type": "Bridge", "enabled": true},
                                    {"type": "Router", "enabled": false}
                                ]
                            }
                        },
                        "port": {"id": {"type": "ifname", "value": "Ethernet1"}}
                    }},
                    {"eno1v0": {
                        "chassis": {"id": {"type": "mac", "value": "0c:29:ef:c9:46:a0"}},
                        "port": {"id": {"type": "ifname", "value": "Ethernet1"}}
                    }},
                    {"bond0.100": {
                        "chassis": {"leaf-01": {"id": {"type": "mac", "value": "0c:29:ef:c9:46:a0"}}},
                        "port": {"id": {"type": "ifname", "value": "Ethernet1"}}
                    }}
                ]
            }
        })
        .to_string(),
    );
    answers.insert(
        LINK_LIST_COMMAND.to_string(),
        json!([
            {"ifindex": 1, "ifname": "lo", "mtu": 65536},
            {"ifindex": 2, "ifname": "eno1", "mtu": 9000},
            {"ifindex": 3, "ifname": "eno2", "mtu": 1500},
            {"ifindex": 4, "ifname": "eno1v0", "mtu": 1500}
        ])
        .to_string(),
    );

    for (interface, role) in [("eno1", "pf"), ("eno2", "pf"), ("eno1v0", "vf"), ("bond0.100", "vlan")] {
        answers.insert(role_check_command(interface), role.to_string());
    }
    let details = [
        ("eno1", ["0x16d7", "0x14e4", "0", "25000", "up", "4"]),
        ("eno2", ["0x1521", "0x8086", "1", "-1", "down", "0"]),
    ];
    for (interface, values) in details {
        for (command, value) in enrichment_commands(interface).into_iter().zip(values) {
            answers.insert(command, format!("{value}\n"));
        }
    }
    answers
}

fn fleet() -> Fleet {
    Fleet::default()
        .with_server("root@compute-01", compute_node())
        .with_unreachable("root@compute-02")
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_full_scan_reports_physical_interfaces_only() {
    let fleet = fleet();
    let rows = scan_topology(&fleet, "root@compute-01", ScanOptions::default())
        .await
        .unwrap();

    let interfaces: Vec<&str> = rows.iter().map(|r| r.local_interface.as_str()).collect();
    assert_eq!(interfaces, vec!["eno1", "eno2"]);
    assert!(rows.iter().all(|r| r.local_role == InterfaceRole::PhysicalFunction));
    assert!(rows.iter().all(|r| r.local_extra == NOT_REQUESTED));
    assert!(rows.iter().all(|r| r.local_capabilities.to_string() == "XXX1"));

    assert_eq!(rows[0].remote_chassis.as_deref(), Some("leaf-01"));
    assert_eq!(rows[0].remote_port.as_deref(), Some("Ethernet1"));
    assert_eq!(
        rows[0].remote_capabilities.map(|c| c.to_string()),
        Some("10XX".to_string())
    );
    assert_eq!(rows[1].remote_chassis, None);
}

#[tokio::test]
async fn test_quick_scan_is_the_neighbor_subset_of_full_scan() {
    let fleet = fleet();
    let full = scan_topology(&fleet, "root@compute-01", ScanOptions::default())
        .await
        .unwrap();
    let quick = scan_topology(
        &fleet,
        "root@compute-01",
        ScanOptions::default().with_quick(true),
    )
    .await
    .unwrap();

    let expected: Vec<_> = full
        .into_iter()
        .filter(|row| row.remote_chassis.is_some())
        .collect();
    assert_eq!(quick, expected);
    assert!(quick.iter().all(|row| row.remote_port.is_some()));
}

#[tokio::test]
async fn test_extra_scan_fills_summary() {
    let fleet = fleet();
    let rows = scan_topology(
        &fleet,
        "root@compute-01",
        ScanOptions::default().with_extra(true),
    )
    .await
    .unwrap();

    assert_eq!(
        rows[0].local_extra,
        "Broadcom,0x14e4,BCM-57414 NextXtreme-E,0x16d7,25000,up,4"
    );
    assert_eq!(
        rows[1].local_extra,
        "Intel,0x8086,e1000 I350 Copper,0x1521,-1,down,0"
    );
}

#[tokio::test]
async fn test_list_interfaces() {
    let fleet = fleet();
    let rows = list_interfaces(&fleet, "root@compute-01").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].server, "root@compute-01");
    assert_eq!(rows[0].interface, "eno1");
    assert_eq!(rows[0].vendor_name, "Broadcom");
    assert_eq!(rows[0].numa_id, "0");
    assert_eq!(rows[0].numvfs, "4");
    assert_eq!(rows[1].interface, "eno2");
    assert_eq!(rows[1].device_name, "e1000 I350 Copper");
    assert_eq!(rows[1].speed, "-1");
    assert_eq!(rows[1].operstate, "down");
}

#[tokio::test]
async fn test_unreachable_server_fails_alone() {
    let fleet = fleet();

    let err = scan_topology(&fleet, "root@compute-02", ScanOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TopoError::Remote(RemoteExecutionError::NonZeroExit { exit_code: Some(255), .. })
    ));
    assert!(err.to_string().contains("root@compute-02"));

    let rows = scan_topology(&fleet, "root@compute-01", ScanOptions::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_rendered_csv() {
    let fleet = fleet();
    let rows = scan_topology(&fleet, "root@compute-01", ScanOptions::default())
        .await
        .unwrap();
    let csv = render(&rows, OutputFormat::Csv).unwrap();

    assert_eq!(
        csv,
        "Edge 1;ChassisID 1;BRWS 1;Iface 1;Iface 1 Type;Iface 1 Extra;MAC 1;Edge 2;ChassisID 2;BRWS 2;Iface 2\n\
         compute-01;3c:ec:ef:00:00:01;XXX1;eno1;pf;N/A;3c:ec:ef:00:00:11;leaf-01;0c:29:ef:c9:46:a0;10XX;Ethernet1\n\
         compute-01;3c:ec:ef:00:00:01;XXX1;eno2;pf;N/A;3c:ec:ef:00:00:12;;;;\n"
    );
}
