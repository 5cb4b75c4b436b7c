//! SSH transport built on the OpenSSH client binary.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{RemoteExecutionError, RemoteExecutor};

/// Default lifetime of the shared master connection after the last command.
const DEFAULT_CONTROL_PERSIST_SECS: u64 = 60;

/// Socket path for multiplexed sessions. `%C` hashes user, host and port.
const CONTROL_PATH: &str = "~/.ssh/lldp-topo-%C";

/// SSH transport configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Alternative command that wraps ssh (e.g. `juju ssh`). It receives the
    /// server and the remote command as its last two arguments.
    pub alt_command: Option<String>,
    /// `ConnectTimeout` passed to the native client.
    pub connect_timeout_secs: Option<u64>,
    /// Share one master connection between the commands of a batch.
    pub multiplex: bool,
    /// `ControlPersist` for the master connection.
    pub control_persist_secs: u64,
    /// Trust and record host keys of servers not yet in `known_hosts`.
    pub accept_new_host_keys: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            alt_command: None,
            connect_timeout_secs: None,
            multiplex: true,
            control_persist_secs: DEFAULT_CONTROL_PERSIST_SECS,
            accept_new_host_keys: false,
        }
    }
}

impl SshConfig {
    /// Use an alternative ssh wrapper instead of the native client.
    #[must_use]
    pub fn with_alt_command(mut self, alt_command: Option<String>) -> Self {
        self.alt_command = alt_command.filter(|cmd| !cmd.trim().is_empty());
        self
    }

    /// Set the connection timeout of the native client.
    #[must_use]
    pub fn with_connect_timeout(mut self, secs: Option<u64>) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Enable or disable connection multiplexing.
    #[must_use]
    pub fn with_multiplex(mut self, multiplex: bool) -> Self {
        self.multiplex = multiplex;
        self
    }

    /// Accept host keys of servers not yet in `known_hosts`. Changed keys
    /// are still rejected.
    #[must_use]
    pub fn with_accept_new_host_keys(mut self, accept: bool) -> Self {
        self.accept_new_host_keys = accept;
        self
    }
}

/// Runs commands through `ssh <server> <command>` or an alternative wrapper.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: SshConfig,
    /// Pre-split alternative command, if configured.
    alt_argv: Option<Vec<String>>,
}

impl SshExecutor {
    /// Create a new executor.
    ///
    /// # Errors
    /// Returns [`RemoteExecutionError::Config`] if the alternative command
    /// cannot be split into words.
    pub fn new(config: SshConfig) -> Result<Self, RemoteExecutionError> {
        let alt_argv = match config.alt_command.as_deref() {
            Some(alt) => {
                let argv = shlex::split(alt).ok_or_else(|| {
                    RemoteExecutionError::Config(format!("unbalanced quoting in `{alt}`"))
                })?;
                if argv.is_empty() {
                    return Err(RemoteExecutionError::Config(
                        "alternative command is empty".to_string(),
                    ));
                }
                Some(argv)
            }
            None => None,
        };

        Ok(Self { config, alt_argv })
    }

    /// Program and arguments used to run `command` on `server`.
    fn command_line(&self, server: &str, command: &str) -> (String, Vec<String>) {
        if let Some(argv) = &self.alt_argv {
            let mut args: Vec<String> = argv[1..].to_vec();
            args.push(server.to_string());
            args.push(command.to_string());
            return (argv[0].clone(), args);
        }

        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(timeout) = self.config.connect_timeout_secs {
            args.push("-o".to_string());
            args.push(format!("ConnectTimeout={timeout}"));
        }
        if self.config.accept_new_host_keys {
            args.push("-o".to_string());
            args.push("StrictHostKeyChecking=accept-new".to_string());
        }
        if self.config.multiplex {
            args.extend([
                "-o".to_string(),
                "ControlMaster=auto".to_string(),
                "-o".to_string(),
                format!("ControlPath={CONTROL_PATH}"),
                "-o".to_string(),
                format!("ControlPersist={}", self.config.control_persist_secs),
            ]);
        }
        args.push(server.to_string());
        args.push(command.to_string());
        ("ssh".to_string(), args)
    }

    async fn execute(&self, server: &str, command: &str) -> Result<String, RemoteExecutionError> {
        let (program, args) = self.command_line(server, command);

        debug!(
            server = %server,
            command = %command,
            program = %program,
            "Executing remote command"
        );

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteExecutionError::Spawn {
                server: server.to_string(),
                program: program.clone(),
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            debug!(server = %server, command = %command, stdout = %stdout.trim(), "Command succeeded");
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(server = %server, command = %command, "Command failed");
        error!(server = %server, stderr = %stderr, stdout = %stdout.trim(), "Command output");
        Err(RemoteExecutionError::NonZeroExit {
            server: server.to_string(),
            command: command.to_string(),
            exit_code: output.status.code(),
            stderr,
        })
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run_one(&self, server: &str, command: &str) -> Result<String, RemoteExecutionError> {
        let output = self.execute(server, command).await?;
        info!(server = %server, command = %command, "Command completed successfully");
        Ok(output)
    }

    async fn run_batch(
        &self,
        server: &str,
        commands: &[String],
    ) -> Result<Vec<String>, RemoteExecutionError> {
        info!(server = %server, count = commands.len(), "Running command batch");
        let mut answers = Vec::with_capacity(commands.len());
        for command in commands {
            let output = self.execute(server, command).await?;
            answers.push(output.trim().to_string());
        }
        Ok(answers)
    }
}
