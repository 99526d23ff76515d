//! Capability and connection-state types
//!
//! The connection state machine is one-way by design: a failed or
//! disconnected instance is never silently revived.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// Capability family exposed by an adapter.
///
/// Determines which extended operations are available beyond the base
/// lifecycle contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Parameterized statements and transactions.
    Sql,
    /// Collection-scoped filter CRUD.
    Document,
    /// Lifecycle and health only; callers use the native handle directly.
    Opaque,
}

impl Capability {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Sql => "sql",
            Capability::Document => "document",
            Capability::Opaque => "opaque",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(Capability::Sql),
            "document" => Ok(Capability::Document),
            "opaque" => Ok(Capability::Opaque),
            _ => Err(ParseCapabilityError(s.to_string())),
        }
    }
}

/// Error parsing capability from string.
#[derive(Debug, Clone)]
pub struct ParseCapabilityError(String);

impl fmt::Display for ParseCapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid capability '{}', expected one of: sql, document, opaque",
            self.0
        )
    }
}

impl std::error::Error for ParseCapabilityError {}

/// Lifecycle state of an adapter instance.
///
/// Valid transitions:
/// `Uninitialized -> Connecting -> Connected | Failed`, and
/// `Connected -> Disconnected`. `Failed` and `Disconnected` are terminal for
/// the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Constructed, connect not yet attempted.
    #[default]
    Uninitialized,
    /// Connect attempt in flight.
    Connecting,
    /// Connect succeeded; operations are available.
    Connected,
    /// Connect failed; the instance stays excluded until a new epoch.
    Failed,
    /// Disconnected; terminal.
    Disconnected,
}

impl ConnectionState {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thread-safe holder for an adapter's [`ConnectionState`] that enforces the
/// legal transitions.
///
/// `connect`/`disconnect` implementations are the only callers of the mutating
/// methods; everything else reads.
#[derive(Debug, Default)]
pub struct StateCell {
    inner: RwLock<ConnectionState>,
}

impl StateCell {
    /// Create a new cell in the `Uninitialized` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.read().expect("state lock poisoned")
    }

    /// Check if the state is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Move `Uninitialized -> Connecting`.
    ///
    /// Returns the current state as the error when the transition is not
    /// legal, so the adapter can report it under its own name.
    pub fn begin_connect(&self) -> Result<(), ConnectionState> {
        let mut state = self.inner.write().expect("state lock poisoned");
        match *state {
            ConnectionState::Uninitialized => {
                *state = ConnectionState::Connecting;
                Ok(())
            }
            other => Err(other),
        }
    }

    /// Move `Connecting -> Connected`.
    pub fn mark_connected(&self) {
        *self.inner.write().expect("state lock poisoned") = ConnectionState::Connected;
    }

    /// Move `Connecting -> Failed`.
    pub fn mark_failed(&self) {
        *self.inner.write().expect("state lock poisoned") = ConnectionState::Failed;
    }

    /// Move to `Disconnected`. Idempotent, legal from any state.
    pub fn mark_disconnected(&self) {
        *self.inner.write().expect("state lock poisoned") = ConnectionState::Disconnected;
    }
}
