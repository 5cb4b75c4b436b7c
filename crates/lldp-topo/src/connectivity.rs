//! Pre-flight check of SSH access and `lldpcli` availability.

use std::fmt;

use tracing::{info, warn};

use crate::transport::RemoteExecutor;

/// Command used to verify that the SSH transport works.
pub const SSH_CHECK_COMMAND: &str = "echo";

/// Command used to verify that `lldpcli` is installed and can reach `lldpd`.
pub const LLDPCLI_CHECK_COMMAND: &str = "lldpcli show chassis";

/// Outcome of checking one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub server: String,
    pub ssh_ok: bool,
    /// `None` when SSH already failed and `lldpcli` was not tried.
    pub lldpcli_ok: Option<bool>,
}

impl ConnectivityReport {
    /// Whether every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.ssh_ok && self.lldpcli_ok == Some(true)
    }
}

impl fmt::Display for ConnectivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ssh_ok {
            return write!(f, "Server {}: SSH NOT working", self.server);
        }
        writeln!(f, "Server {}: SSH working", self.server)?;
        match self.lldpcli_ok {
            Some(true) => write!(f, "Server {}: LLDPCLI working", self.server),
            _ => write!(f, "Server {}: LLDPCLI NOT working", self.server),
        }
    }
}

/// Check SSH and then `lldpcli` on `server`. Failures are reported, not
/// returned as errors.
pub async fn check_connectivity(executor: &dyn RemoteExecutor, server: &str) -> ConnectivityReport {
    if let Err(e) = executor.run_one(server, SSH_CHECK_COMMAND).await {
        warn!(server = %server, error = %e, "SSH check failed");
        return ConnectivityReport {
            server: server.to_string(),
            ssh_ok: false,
            lldpcli_ok: None,
        };
    }

    info!(server = %server, command = LLDPCLI_CHECK_COMMAND, "LLDP command");
    let lldpcli_ok = match executor.run_one(server, LLDPCLI_CHECK_COMMAND).await {
        Ok(_) => true,
        Err(e) => {
            warn!(server = %server, error = %e, "lldpcli check failed");
            false
        }
    };

    ConnectivityReport {
        server: server.to_string(),
        ssh_ok: true,
        lldpcli_ok: Some(lldpcli_ok),
    }
}
