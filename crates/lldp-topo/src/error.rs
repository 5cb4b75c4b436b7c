//! Error types for topology discovery.

use thiserror::Error;

use crate::transport::RemoteExecutionError;

/// A document returned by a remote command did not have the expected shape.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Output was not valid JSON, or JSON of the wrong structure.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A neighbor's chassis object must carry exactly one key.
    #[error("expected a single chassis for interface {interface}, found {} keys: {keys:?}", keys.len())]
    NeighborChassis { interface: String, keys: Vec<String> },

    /// `local-chassis.chassis` must carry exactly one key.
    #[error("expected a single local chassis, found {} keys: {keys:?}", keys.len())]
    LocalChassis { keys: Vec<String> },

    /// Every entry of the interface list must carry exactly one key.
    #[error("expected a single key in interface entry, found {} keys: {keys:?}", keys.len())]
    InterfaceEntry { keys: Vec<String> },
}

/// Errors that abort the scan of one server.
#[derive(Debug, Error)]
pub enum TopoError {
    /// The transport failed or a remote command exited non-zero.
    #[error(transparent)]
    Remote(#[from] RemoteExecutionError),

    /// A remote command returned a document we cannot interpret.
    #[error("server {server}: unexpected output from `{command}`: {source}")]
    Malformed {
        server: String,
        command: String,
        #[source]
        source: ShapeError,
    },

    /// A batch returned fewer answers than a later lookup needed.
    #[error("server {server}: missing answer #{index} for `{command}` (only {received} received)")]
    MissingAnswer {
        server: String,
        command: String,
        index: usize,
        received: usize,
    },
}

impl TopoError {
    /// Attach server and command context to a shape error.
    #[must_use]
    pub fn malformed(server: &str, command: &str, source: impl Into<ShapeError>) -> Self {
        Self::Malformed {
            server: server.to_string(),
            command: command.to_string(),
            source: source.into(),
        }
    }
}
