//! Remote command execution.
//!
//! The discovery code only needs two operations from a transport: run one
//! command on a server, and run an ordered list of commands on a server in
//! one session. [`SshExecutor`] is the production implementation; tests
//! substitute scripted executors.

mod ssh;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use ssh::{SshConfig, SshExecutor};

/// Errors raised while executing commands on a remote server.
#[derive(Error, Debug)]
pub enum RemoteExecutionError {
    /// The local transport process could not be started.
    #[error("server {server}: failed to launch `{program}` for `{command}`: {source}")]
    Spawn {
        server: String,
        program: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully (or the connection failed).
    #[error("server {server}: `{command}` failed ({}): {stderr}", exit_label(.exit_code))]
    NonZeroExit {
        server: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The transport itself is misconfigured.
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Executes shell commands on named servers.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a single command and return its standard output.
    async fn run_one(&self, server: &str, command: &str) -> Result<String, RemoteExecutionError>;

    /// Run `commands` in order within one session.
    ///
    /// On success the returned outputs line up index-for-index with
    /// `commands`. Implementations that may collect fewer answers than
    /// commands must still return what they have; callers treat a short
    /// result as a warning.
    async fn run_batch(
        &self,
        server: &str,
        commands: &[String],
    ) -> Result<Vec<String>, RemoteExecutionError>;
}

/// Run a batch and warn when the number of answers does not match.
///
/// # Errors
///
/// Propagates any failure of the underlying executor.
pub async fn run_batch_checked(
    executor: &dyn RemoteExecutor,
    server: &str,
    commands: &[String],
) -> Result<Vec<String>, RemoteExecutionError> {
    let answers = executor.run_batch(server, commands).await?;
    if answers.len() != commands.len() {
        warn!(
            server = %server,
            commands = commands.len(),
            answers = answers.len(),
            "Length of command list executed via SSH does not match length of answers"
        );
    }
    Ok(answers)
}
