//! Adapter capability traits
//!
//! One base lifecycle trait plus capability extensions. The manager stores
//! `Arc<dyn Adapter>` and callers downcast at the point of use via
//! [`Adapter::as_sql`] / [`Adapter::as_document`]; a mismatch is a clean
//! `CapabilityMismatch` error, never a panic.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::error;

use crate::error::{AdapterError, AdapterResult};
use crate::types::{Capability, ConnectionState};
use crate::value::{Filter, Record, Value};

/// Base trait for all backend adapters.
///
/// `connect` and `disconnect` are the only operations permitted to mutate the
/// connection state.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Provider name this instance was configured under (e.g.
    /// "postgres-primary").
    fn name(&self) -> &str;

    /// Provider kind as registered in the registry (e.g. "postgres").
    fn kind(&self) -> &'static str;

    /// Capability family exposed by this adapter.
    fn capability(&self) -> Capability;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Check if the adapter completed `connect` and has not been
    /// disconnected.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Establish the backend connection.
    ///
    /// On failure the adapter moves to the `Failed` state and stays excluded
    /// from the live set until a new manager epoch.
    async fn connect(&self) -> AdapterResult<()>;

    /// Release the backend connection.
    ///
    /// Idempotent: safe to call on an already-disconnected instance.
    async fn disconnect(&self) -> AdapterResult<()>;

    /// Perform a lightweight liveness round trip (trivial query or ping).
    ///
    /// Never errors; any failure collapses to `false`.
    async fn health_check(&self) -> bool;

    /// Access the concrete adapter for native-handle extraction.
    ///
    /// Concrete adapters expose typed handle accessors (pool, client) that
    /// fail with `NotConnected` before a successful connect.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to the SQL capability, if this adapter has it.
    fn as_sql(&self) -> Option<&dyn SqlAdapter> {
        None
    }

    /// Downcast to the document capability, if this adapter has it.
    fn as_document(&self) -> Option<&dyn DocumentAdapter> {
        None
    }
}

fn fmt_adapter(adapter: &dyn Adapter, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Adapter")
        .field("name", &adapter.name())
        .field("kind", &adapter.kind())
        .field("state", &adapter.state())
        .finish()
}

impl fmt::Debug for dyn Adapter + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_adapter(self, f)
    }
}

impl fmt::Debug for dyn SqlAdapter + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_adapter(self, f)
    }
}

impl fmt::Debug for dyn DocumentAdapter + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_adapter(self, f)
    }
}

/// Require the SQL capability from an adapter, with a clean error otherwise.
pub fn require_sql(adapter: &dyn Adapter) -> AdapterResult<&dyn SqlAdapter> {
    adapter.as_sql().ok_or_else(|| AdapterError::CapabilityMismatch {
        provider: adapter.name().to_string(),
        expected: Capability::Sql,
    })
}

/// Require the document capability from an adapter, with a clean error
/// otherwise.
pub fn require_document(adapter: &dyn Adapter) -> AdapterResult<&dyn DocumentAdapter> {
    adapter
        .as_document()
        .ok_or_else(|| AdapterError::CapabilityMismatch {
            provider: adapter.name().to_string(),
            expected: Capability::Document,
        })
}

/// Result of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement.
    pub rows_affected: u64,
}

/// Outcome of a document update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Number of documents that matched the filter.
    pub matched: u64,
    /// Number of documents actually modified.
    pub modified: u64,
}

/// Capability for parameterized SQL with transactions.
///
/// Statements use `?` placeholders regardless of backend; each adapter maps
/// them to its native syntax.
#[async_trait]
pub trait SqlAdapter: Adapter {
    /// Run a statement that returns rows.
    async fn query(&self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>>;

    /// Run a statement that returns an affected-row count.
    async fn execute(&self, statement: &str, params: &[Value]) -> AdapterResult<ExecuteResult>;

    /// Begin a transaction on a dedicated pooled connection.
    ///
    /// Most callers want [`with_transaction`] instead, which guarantees
    /// commit-or-rollback.
    async fn begin(&self) -> AdapterResult<Box<dyn SqlTransaction>>;
}

/// A transaction handle owning one pooled connection until commit/rollback.
#[async_trait]
pub trait SqlTransaction: Send {
    /// Run a statement that returns rows, inside the transaction.
    async fn query(&mut self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>>;

    /// Run a statement that returns an affected-row count, inside the
    /// transaction.
    async fn execute(&mut self, statement: &str, params: &[Value])
        -> AdapterResult<ExecuteResult>;

    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> AdapterResult<()>;

    /// Roll the transaction back.
    async fn rollback(self: Box<Self>) -> AdapterResult<()>;
}

/// Run `body` inside a transaction: commit on `Ok`, roll back on `Err`.
///
/// The error from `body` is what the caller receives, regardless of the
/// rollback outcome; a rollback failure is logged, never substituted.
///
/// ```ignore
/// let value = with_transaction(sql, |tx| {
///     Box::pin(async move {
///         tx.execute("INSERT INTO audit (event) VALUES (?)", &["login".into()])
///             .await?;
///         tx.query("SELECT count(*) AS n FROM audit", &[]).await
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<T, F>(sql: &dyn SqlAdapter, body: F) -> AdapterResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn SqlTransaction) -> BoxFuture<'t, AdapterResult<T>> + Send,
{
    let mut tx = sql.begin().await?;

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                // The original error still propagates below.
                error!(
                    provider = %sql.name(),
                    error = %rollback_err,
                    "rollback failed after transaction body error"
                );
            }
            Err(err)
        }
    }
}

/// Capability for collection-scoped document CRUD.
#[async_trait]
pub trait DocumentAdapter: Adapter {
    /// Get a handle to the named collection.
    ///
    /// Fails with `NotConnected` before a successful connect.
    async fn collection(&self, name: &str) -> AdapterResult<Box<dyn DocumentCollection>>;
}

/// Operations on a single document collection.
///
/// Filters are equality-only. `update_one`/`delete_one` act on the first
/// matching document under a backend-defined ordering; callers needing a
/// specific document must filter by a unique key. Write operations report
/// zero counts (not errors) when the filter matches nothing.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Name of the collection this handle is scoped to.
    fn name(&self) -> &str;

    /// Find all documents matching the filter (all documents when `None`).
    async fn find(&self, filter: Option<&Filter>) -> AdapterResult<Vec<Record>>;

    /// Find the first document matching the filter.
    async fn find_one(&self, filter: &Filter) -> AdapterResult<Option<Record>>;

    /// Insert one document; returns the backend-assigned identifier.
    async fn insert_one(&self, document: Record) -> AdapterResult<Value>;

    /// Insert many documents; returns the number inserted.
    async fn insert_many(&self, documents: Vec<Record>) -> AdapterResult<u64>;

    /// Merge `changes` into the first matching document (partial update,
    /// never a replace).
    async fn update_one(&self, filter: &Filter, changes: Record) -> AdapterResult<WriteOutcome>;

    /// Merge `changes` into every matching document.
    async fn update_many(&self, filter: &Filter, changes: Record) -> AdapterResult<WriteOutcome>;

    /// Delete the first matching document; returns the deleted count.
    async fn delete_one(&self, filter: &Filter) -> AdapterResult<u64>;

    /// Delete every matching document; returns the deleted count.
    async fn delete_many(&self, filter: &Filter) -> AdapterResult<u64>;

    /// Count documents matching the filter (all documents when `None`).
    async fn count(&self, filter: Option<&Filter>) -> AdapterResult<u64>;
}

impl fmt::Debug for dyn DocumentCollection + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateCell;
    use std::sync::atomic::{AtomicBool, Ordering};

    // Minimal opaque adapter used to exercise the base contract.
    struct ProbeAdapter {
        name: String,
        state: StateCell,
        healthy: AtomicBool,
    }

    impl ProbeAdapter {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                state: StateCell::new(),
                healthy: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl Adapter for ProbeAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &'static str {
            "probe"
        }

        fn capability(&self) -> Capability {
            Capability::Opaque
        }

        fn state(&self) -> ConnectionState {
            self.state.state()
        }

        async fn connect(&self) -> AdapterResult<()> {
            self.state
                .begin_connect()
                .map_err(|state| {
                    AdapterError::operation_failed(format!(
                        "cannot connect '{}' from state {state}",
                        self.name
                    ))
                })?;
            self.state.mark_connected();
            Ok(())
        }

        async fn disconnect(&self) -> AdapterResult<()> {
            self.state.mark_disconnected();
            Ok(())
        }

        async fn health_check(&self) -> bool {
            self.is_connected() && self.healthy.load(Ordering::SeqCst)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn lifecycle_and_health() {
        let adapter = ProbeAdapter::new("probe-1");
        assert!(!adapter.is_connected());
        assert!(!adapter.health_check().await);

        adapter.connect().await.unwrap();
        assert!(adapter.is_connected());
        assert!(adapter.health_check().await);

        adapter.healthy.store(false, Ordering::SeqCst);
        assert!(!adapter.health_check().await);

        adapter.disconnect().await.unwrap();
        adapter.disconnect().await.unwrap();
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn double_connect_is_rejected() {
        let adapter = ProbeAdapter::new("probe-2");
        adapter.connect().await.unwrap();
        let err = adapter.connect().await.unwrap_err();
        assert!(err.to_string().contains("connected"));
    }

    #[test]
    fn capability_downcasts_default_to_none() {
        let adapter = ProbeAdapter::new("probe-3");
        assert!(adapter.as_sql().is_none());
        assert!(adapter.as_document().is_none());

        let err = require_sql(&adapter).unwrap_err();
        assert!(matches!(err, AdapterError::CapabilityMismatch { .. }));
        let err = require_document(&adapter).unwrap_err();
        assert!(err.to_string().contains("document"));
    }

    #[test]
    fn trait_objects_format_for_diagnostics() {
        let adapter = ProbeAdapter::new("probe-5");
        let dynamic: &dyn Adapter = &adapter;
        let rendered = format!("{dynamic:?}");
        assert!(rendered.contains("probe-5"), "rendered: {rendered}");
        assert!(rendered.contains("probe"), "rendered: {rendered}");

        // Result combinators over adapter handles rely on this impl.
        let result: AdapterResult<&dyn Adapter> = Ok(dynamic);
        assert!(result.is_ok());
        assert!(format!("{result:?}").contains("probe-5"));
    }

    #[test]
    fn native_handle_downcast() {
        let adapter = ProbeAdapter::new("probe-4");
        let dynamic: &dyn Adapter = &adapter;
        let concrete = dynamic.as_any().downcast_ref::<ProbeAdapter>().unwrap();
        assert_eq!(concrete.name(), "probe-4");
        assert!(dynamic.as_any().downcast_ref::<StateCell>().is_none());
    }
}
