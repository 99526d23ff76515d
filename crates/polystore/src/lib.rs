//! # polystore
//!
//! One connection manager for heterogeneous backends: PostgreSQL, SQLite,
//! MongoDB, and managed HTTP services behind a single lifecycle and
//! capability contract.
//!
//! This facade wires every built-in provider kind into a ready registry:
//!
//! ```ignore
//! use polystore::prelude::*;
//!
//! let manager = ConnectionManager::new(polystore::default_registry());
//! let config: ManagerConfig = serde_json::from_str(&settings_json)?;
//!
//! let report = manager.initialize(config).await;
//! if !report.all_connected() {
//!     tracing::warn!(failed = ?report.failed, skipped = ?report.skipped, "partial startup");
//! }
//!
//! let sql = require_sql(manager.get("analytics").await?.as_ref())?;
//! let rows = sql.query("SELECT * FROM events WHERE kind = ?", &["login".into()]).await?;
//!
//! manager.disconnect().await;
//! ```
//!
//! Applications with custom backends register their own constructors on top
//! of (or instead of) the defaults; see [`AdapterRegistry::register`].

pub use polystore_core::prelude;
pub use polystore_core::{async_trait, config, error, manager, registry, traits, types, value};

pub use polystore_cloud::{AuthMethod, CloudAdapter, CloudConfig};
pub use polystore_mongo::{MongoAdapter, MongoConfig};
pub use polystore_sql::{PostgresAdapter, PostgresConfig, SqliteAdapter, SqliteConfig, SslMode};

use polystore_core::registry::AdapterRegistry;

/// Registry with every built-in provider kind registered.
///
/// Kinds: `postgres`, `sqlite`, `mongodb`, `http`.
#[must_use]
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register("postgres", PostgresAdapter::from_settings);
    registry.register("sqlite", SqliteAdapter::from_settings);
    registry.register("mongodb", MongoAdapter::from_settings);
    registry.register("http", CloudAdapter::from_settings);
    registry
}
