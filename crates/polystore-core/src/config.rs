//! Configuration traits and shared connection settings
//!
//! Provider settings are opaque to the manager: each adapter constructor
//! deserializes and validates its own shape. Anything logged goes through
//! `redacted()`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AdapterResult;
use crate::types::Capability;

/// Trait for provider-specific configuration.
///
/// Each adapter crate implements this for its settings type to define the
/// validation rules and credential redaction.
pub trait AdapterConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Get the capability family this configuration is for.
    fn capability() -> Capability;

    /// Validate the configuration.
    ///
    /// Returns an error if a required field is missing or invalid. Called
    /// synchronously at adapter construction time.
    fn validate(&self) -> AdapterResult<()>;

    /// Create a redacted version of this config for logging/display.
    ///
    /// Sensitive fields are replaced with placeholders.
    fn redacted(&self) -> Self;
}

/// Common connection settings shared across provider kinds.
///
/// Every adapter feeds these to its driver so a hanging backend is bounded
/// without a manager-level timeout layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Read/request timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Connection pool size, for pooled drivers.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

fn default_pool_size() -> u32 {
    5
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
            pool_size: default_pool_size(),
        }
    }
}

impl ConnectionSettings {
    /// Create new connection settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Get the connection timeout as a `Duration`.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the read timeout as a `Duration`.
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs)
    }
}

/// Placeholder used wherever credentials are redacted for display.
pub const REDACTED: &str = "***REDACTED***";
