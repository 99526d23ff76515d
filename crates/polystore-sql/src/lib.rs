//! # polystore-sql
//!
//! SQL capability family: PostgreSQL and SQLite adapters over sqlx.
//!
//! Both adapters speak the portable contract from `polystore-core`: `?`
//! placeholders, `Value` parameters, `Record` rows, and pooled transactions.
//! The PostgreSQL adapter rewrites placeholders to `$n`; SQLite takes them
//! natively.
//!
//! Backend-specific work goes through the native pool:
//!
//! ```ignore
//! let adapter = manager.get("analytics").await?;
//! let pg = adapter
//!     .as_any()
//!     .downcast_ref::<PostgresAdapter>()
//!     .ok_or_else(|| AdapterError::operation_failed("not a postgres provider"))?;
//! let pool = pg.pool().await?;
//! ```

pub mod config;
pub mod helpers;
pub mod placeholder;
pub mod postgres;
pub mod sqlite;

pub use config::{PostgresConfig, SqliteConfig, SslMode};
pub use helpers::{delete_where, insert, select_all, update_where};
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;
