//! Hardware inventory over a BMC's Redfish API.
//!
//! Counts CPUs, memory, disks and network interfaces of every system the
//! service exposes. Individual failed requests are logged and skipped.

mod client;
mod models;

use thiserror::Error;

pub use client::{RedfishClient, SERVICE_ROOT};
pub use models::SystemInventory;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors from the Redfish inventory.
#[derive(Debug, Error)]
pub enum RedfishError {
    #[error("invalid Redfish base URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Redfish service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Connection settings for a Redfish service.
#[derive(Debug, Clone)]
pub struct RedfishConfig {
    /// Base URL, e.g. `https://192.0.2.10`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    pub timeout_secs: u64,
}

impl RedfishConfig {
    /// Create a config with certificate verification on.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            insecure: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
