//! # polystore-cloud
//!
//! Opaque capability family: adapter for managed HTTP services.
//!
//! Standardizes lifecycle and health probing for APIs that have no portable
//! query surface. Callers reach the configured [`reqwest::Client`] through
//! the native-handle escape hatch and speak the service's own protocol.

pub mod adapter;
pub mod config;

pub use adapter::CloudAdapter;
pub use config::{AuthMethod, CloudConfig};
