//! PostgreSQL adapter
//!
//! Wraps a sqlx `PgPool` behind the SQL capability. Portable `?` placeholders
//! are rewritten to `$n` before the statement reaches the server.

use std::any::Any;
use std::sync::Arc;

use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use polystore_core::async_trait;
use polystore_core::config::AdapterConfig;
use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::registry::BoxedAdapter;
use polystore_core::traits::{Adapter, ExecuteResult, SqlAdapter, SqlTransaction};
use polystore_core::types::{Capability, ConnectionState, StateCell};
use polystore_core::value::{Record, Value};

use crate::config::PostgresConfig;
use crate::placeholder::{count_placeholders, to_dollar_placeholders};

/// Adapter for the `postgres` provider kind.
pub struct PostgresAdapter {
    name: String,
    config: PostgresConfig,
    state: StateCell,
    pool: RwLock<Option<PgPool>>,
}

impl PostgresAdapter {
    /// Create an unconnected adapter from validated config.
    pub fn new(name: impl Into<String>, config: PostgresConfig) -> AdapterResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            state: StateCell::new(),
            pool: RwLock::new(None),
        })
    }

    /// Registry constructor: deserialize settings, validate, box.
    pub fn from_settings(name: &str, settings: serde_json::Value) -> AdapterResult<BoxedAdapter> {
        let config: PostgresConfig = serde_json::from_value(settings)?;
        Ok(Arc::new(Self::new(name, config)?))
    }

    /// Get the native connection pool.
    ///
    /// This is the escape hatch for backend-specific features the portable
    /// contract does not cover.
    pub async fn pool(&self) -> AdapterResult<PgPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| AdapterError::not_connected(&self.name))
    }
}

#[async_trait]
impl Adapter for PostgresAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }

    fn capability(&self) -> Capability {
        Capability::Sql
    }

    fn state(&self) -> ConnectionState {
        self.state.state()
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn connect(&self) -> AdapterResult<()> {
        self.state.begin_connect().map_err(|state| {
            AdapterError::operation_failed(format!("cannot connect from state {state}"))
        })?;

        let settings = &self.config.connection;
        let options = PgPoolOptions::new()
            .max_connections(settings.pool_size)
            .acquire_timeout(settings.connection_timeout());

        let url = self.config.connection_url();
        let connect = options.connect(&url);

        let pool = match tokio::time::timeout(settings.connection_timeout(), connect).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(err)) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    format!(
                        "postgres connect to {}:{} failed",
                        self.config.host,
                        self.config.effective_port()
                    ),
                    err,
                ));
            }
            Err(_) => {
                self.state.mark_failed();
                return Err(AdapterError::ConnectionTimeout {
                    timeout_secs: settings.connection_timeout_secs,
                });
            }
        };

        *self.pool.write().await = Some(pool);
        self.state.mark_connected();
        info!(
            host = %self.config.host,
            database = %self.config.database,
            "postgres adapter connected"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn disconnect(&self) -> AdapterResult<()> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            debug!("postgres pool closed");
        }
        self.state.mark_disconnected();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let pool = match self.pool.read().await.clone() {
            Some(pool) => pool,
            None => return false,
        };
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => true,
            Err(err) => {
                warn!(provider = %self.name, error = %err, "postgres health check failed");
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sql(&self) -> Option<&dyn SqlAdapter> {
        Some(self)
    }
}

#[async_trait]
impl SqlAdapter for PostgresAdapter {
    #[instrument(skip(self, params), fields(provider = %self.name))]
    async fn query(&self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>> {
        let pool = self.pool().await?;
        let statement = prepare(statement, params)?;
        let rows = bind_params(sqlx::query(&statement), params)
            .fetch_all(&pool)
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("query failed", err))?;
        rows.iter().map(row_to_record).collect()
    }

    #[instrument(skip(self, params), fields(provider = %self.name))]
    async fn execute(&self, statement: &str, params: &[Value]) -> AdapterResult<ExecuteResult> {
        let pool = self.pool().await?;
        let statement = prepare(statement, params)?;
        let result = bind_params(sqlx::query(&statement), params)
            .execute(&pool)
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("execute failed", err))?;
        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn begin(&self) -> AdapterResult<Box<dyn SqlTransaction>> {
        let pool = self.pool().await?;
        let tx = pool
            .begin()
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("begin failed", err))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// An open transaction holding one pooled connection.
struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl SqlTransaction for PostgresTransaction {
    async fn query(&mut self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>> {
        let statement = prepare(statement, params)?;
        let rows = bind_params(sqlx::query(&statement), params)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("query failed", err))?;
        rows.iter().map(row_to_record).collect()
    }

    async fn execute(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> AdapterResult<ExecuteResult> {
        let statement = prepare(statement, params)?;
        let result = bind_params(sqlx::query(&statement), params)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("execute failed", err))?;
        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("commit failed", err))
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("rollback failed", err))
    }
}

/// Check the parameter count and rewrite placeholders to `$n`.
fn prepare(statement: &str, params: &[Value]) -> AdapterResult<String> {
    let expected = count_placeholders(statement);
    if expected != params.len() {
        return Err(AdapterError::operation_failed(format!(
            "statement has {expected} placeholders but {} parameters were given",
            params.len()
        )));
    }
    Ok(to_dollar_placeholders(statement))
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Boolean(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Binary(bytes) => query.bind(bytes.clone()),
            // Structured parameters have no portable SQL binding.
            Value::Array(_) | Value::Object(_) => {
                query.bind(value.to_json().to_string())
            }
        };
    }
    query
}

fn row_to_record(row: &PgRow) -> AdapterResult<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name())?;
        record.set(column.name(), value);
    }
    Ok(record)
}

/// Decode one cell by probing the common wire types. sqlx rejects a
/// mismatched `try_get`, so the first decode that succeeds is the right one.
fn decode_column(row: &PgRow, ordinal: usize, name: &str) -> AdapterResult<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(ordinal) {
        return Ok(v.into());
    }
    Err(AdapterError::operation_failed(format!(
        "column '{name}' has an unsupported type"
    )))
}
