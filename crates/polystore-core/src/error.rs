//! Error types for adapters and the connection manager
//!
//! One taxonomy with transient/permanent classification so callers can decide
//! their own retry policy; the manager never retries on their behalf.

use thiserror::Error;

use crate::types::Capability;

/// Boxed source error carried alongside a message.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error that can occur while configuring, connecting, or operating a backend
/// adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    // Configuration errors (permanent, raised at construction time)
    /// Provider settings are missing a required field or otherwise invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Provider settings could not be deserialized.
    #[error("invalid provider settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// No constructor is registered for the requested provider kind.
    #[error("unsupported provider kind: {kind}")]
    UnsupportedProvider { kind: String },

    // Connection errors (transient, isolated per adapter)
    /// Network, authentication, or handshake failure during connect.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Connect attempt did not settle within the configured bound.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    // Lifecycle / lookup errors
    /// Operation attempted on a provider that is not in the connected state.
    #[error("provider '{provider}' is not connected")]
    NotConnected { provider: String },

    /// Caller requested a provider name with no live adapter behind it.
    #[error("unknown adapter '{name}' (available: {available})")]
    UnknownAdapter { name: String, available: String },

    /// Default adapter requested while zero adapters are live.
    #[error("no adapters available")]
    NoAdaptersAvailable,

    /// The named provider does not expose the requested capability family.
    #[error("provider '{provider}' does not support {expected} operations")]
    CapabilityMismatch {
        provider: String,
        expected: Capability,
    },

    // Call-time errors, propagated directly to the caller
    /// Failure of a query/execute/collection operation.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl AdapterError {
    /// Check if this error is transient and the caller may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. } | AdapterError::ConnectionTimeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    // Convenience constructors

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        AdapterError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        AdapterError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdapterError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-connected error for the named provider.
    pub fn not_connected(provider: impl Into<String>) -> Self {
        AdapterError::NotConnected {
            provider: provider.into(),
        }
    }

    /// Create an unknown-adapter error that enumerates the live providers.
    pub fn unknown_adapter<'a>(
        name: impl Into<String>,
        live: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut available = live.into_iter().collect::<Vec<_>>().join(", ");
        if available.is_empty() {
            available = "none".to_string();
        }
        AdapterError::UnknownAdapter {
            name: name.into(),
            available,
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        AdapterError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdapterError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AdapterError::connection_failed("refused").is_transient());
        assert!(AdapterError::ConnectionTimeout { timeout_secs: 30 }.is_transient());
        assert!(AdapterError::invalid_config("missing host").is_permanent());
        assert!(AdapterError::operation_failed("bad statement").is_permanent());
        assert!(AdapterError::NoAdaptersAvailable.is_permanent());
    }

    #[test]
    fn unknown_adapter_lists_live_providers() {
        let err = AdapterError::unknown_adapter("b", ["a", "c"]);
        let message = err.to_string();
        assert!(message.contains("'b'"));
        assert!(message.contains("available: a, c"));
    }

    #[test]
    fn unknown_adapter_with_no_live_providers() {
        let err = AdapterError::unknown_adapter("b", []);
        assert!(err.to_string().contains("available: none"));
    }

    #[test]
    fn error_display() {
        let err = AdapterError::not_connected("analytics");
        assert_eq!(err.to_string(), "provider 'analytics' is not connected");

        let err = AdapterError::CapabilityMismatch {
            provider: "cache".to_string(),
            expected: Capability::Sql,
        };
        assert_eq!(
            err.to_string(),
            "provider 'cache' does not support sql operations"
        );
    }

    #[test]
    fn error_with_source() {
        let io = std::io::Error::other("underlying");
        let err = AdapterError::connection_failed_with_source("handshake failed", io);
        if let AdapterError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected ConnectionFailed variant");
        }
    }
}
