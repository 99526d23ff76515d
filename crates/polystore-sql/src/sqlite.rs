//! SQLite adapter
//!
//! Wraps a sqlx `SqlitePool` behind the SQL capability. SQLite takes the
//! portable `?` placeholder syntax natively, so statements pass through
//! unchanged.

use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use polystore_core::async_trait;
use polystore_core::config::AdapterConfig;
use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::registry::BoxedAdapter;
use polystore_core::traits::{Adapter, ExecuteResult, SqlAdapter, SqlTransaction};
use polystore_core::types::{Capability, ConnectionState, StateCell};
use polystore_core::value::{Record, Value};

use crate::config::SqliteConfig;
use crate::placeholder::count_placeholders;

/// Adapter for the `sqlite` provider kind.
pub struct SqliteAdapter {
    name: String,
    config: SqliteConfig,
    state: StateCell,
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteAdapter {
    /// Create an unconnected adapter from validated config.
    pub fn new(name: impl Into<String>, config: SqliteConfig) -> AdapterResult<Self> {
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
        let config: SqliteConfig = serde_json::from_value(settings)?;
        Ok(Arc::new(Self::new(name, config)?))
    }

    /// Get the native connection pool.
    pub async fn pool(&self) -> AdapterResult<SqlitePool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| AdapterError::not_connected(&self.name))
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "sqlite"
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

        let options = match SqliteConnectOptions::from_str(&self.config.connection_url()) {
            Ok(options) => options.create_if_missing(self.config.create_if_missing),
            Err(err) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    format!("invalid sqlite path '{}'", self.config.path),
                    err,
                ));
            }
        };

        let settings = &self.config.connection;
        let pool = match SqlitePoolOptions::new()
            .max_connections(settings.pool_size)
            .acquire_timeout(settings.connection_timeout())
            .connect_with(options)
            .await
        {
            Ok(pool) => pool,
            Err(err) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    format!("sqlite open of '{}' failed", self.config.path),
                    err,
                ));
            }
        };

        *self.pool.write().await = Some(pool);
        self.state.mark_connected();
        info!(path = %self.config.path, "sqlite adapter connected");
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn disconnect(&self) -> AdapterResult<()> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            debug!("sqlite pool closed");
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
                warn!(provider = %self.name, error = %err, "sqlite health check failed");
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
impl SqlAdapter for SqliteAdapter {
    #[instrument(skip(self, params), fields(provider = %self.name))]
    async fn query(&self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>> {
        let pool = self.pool().await?;
        check_params(statement, params)?;
        let rows = bind_params(sqlx::query(statement), params)
            .fetch_all(&pool)
            .await
            .map_err(|err| AdapterError::operation_failed_with_source("query failed", err))?;
        rows.iter().map(row_to_record).collect()
    }

    #[instrument(skip(self, params), fields(provider = %self.name))]
    async fn execute(&self, statement: &str, params: &[Value]) -> AdapterResult<ExecuteResult> {
        let pool = self.pool().await?;
        check_params(statement, params)?;
        let result = bind_params(sqlx::query(statement), params)
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
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// An open transaction holding one pooled connection.
struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl SqlTransaction for SqliteTransaction {
    async fn query(&mut self, statement: &str, params: &[Value]) -> AdapterResult<Vec<Record>> {
        check_params(statement, params)?;
        let rows = bind_params(sqlx::query(statement), params)
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
        check_params(statement, params)?;
        let result = bind_params(sqlx::query(statement), params)
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

fn check_params(statement: &str, params: &[Value]) -> AdapterResult<()> {
    let expected = count_placeholders(statement);
    if expected != params.len() {
        return Err(AdapterError::operation_failed(format!(
            "statement has {expected} placeholders but {} parameters were given",
            params.len()
        )));
    }
    Ok(())
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
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

fn row_to_record(row: &SqliteRow) -> AdapterResult<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name())?;
        record.set(column.name(), value);
    }
    Ok(record)
}

/// Decode one cell. SQLite is dynamically typed so the probe order follows
/// its storage classes; booleans surface as integers.
fn decode_column(row: &SqliteRow, ordinal: usize, name: &str) -> AdapterResult<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(ordinal) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(ordinal) {
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
