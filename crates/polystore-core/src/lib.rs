//! # polystore-core
//!
//! Capability contract and connection manager for heterogeneous data
//! backends.
//!
//! One application often talks to several very different stores at once: a
//! relational database, a document store, a managed cloud endpoint. This
//! crate standardizes their *lifecycle and capability shape* — not their
//! query semantics — behind one abstraction:
//!
//! - [`Adapter`] — base lifecycle trait: connect, disconnect, state, health,
//!   native-handle access.
//! - [`SqlAdapter`] / [`DocumentAdapter`] — capability extensions, downcast
//!   at the point of use.
//! - [`AdapterRegistry`] — provider kind to constructor mapping, producing
//!   unconnected adapters from validated settings.
//! - [`ConnectionManager`] — owns the adapter set for one epoch, with
//!   failure-isolated concurrent connect/disconnect fan-outs.
//!
//! Partial failure is a first-class state: if three of five configured
//! backends fail to connect, the other two stay usable and observable.
//!
//! ## Example
//!
//! ```ignore
//! use polystore_core::prelude::*;
//!
//! let mut registry = AdapterRegistry::new();
//! registry.register("sqlite", sqlite_constructor);
//!
//! let manager = ConnectionManager::new(registry);
//! let report = manager.initialize(config).await;
//! tracing::info!(connected = report.connected.len(), "backends up");
//!
//! let adapter = manager.get("analytics").await?;
//! let sql = require_sql(adapter.as_ref())?;
//! let rows = sql.query("SELECT * FROM events WHERE kind = ?", &["login".into()]).await?;
//!
//! manager.disconnect().await;
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod types;
pub mod value;

/// Prelude module for convenient imports.
///
/// ```
/// use polystore_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{AdapterConfig, ConnectionSettings, REDACTED};
    pub use crate::error::{AdapterError, AdapterResult};
    pub use crate::manager::{ConnectionManager, InitReport, ManagerConfig, ProviderEntry};
    pub use crate::registry::{AdapterConstructor, AdapterRegistry, BoxedAdapter};
    pub use crate::traits::{
        require_document, require_sql, with_transaction, Adapter, DocumentAdapter,
        DocumentCollection, ExecuteResult, SqlAdapter, SqlTransaction, WriteOutcome,
    };
    pub use crate::types::{Capability, ConnectionState, StateCell};
    pub use crate::value::{Filter, Record, Value};
}

// Re-export async_trait for adapter implementors
pub use async_trait::async_trait;
