//! # polystore-mongo
//!
//! Document capability family: MongoDB adapter.
//!
//! Exposes collection-scoped CRUD through the portable contract from
//! `polystore-core`. Updates are always partial (`$set` merges); filters are
//! equality-only. The native `mongodb::Client` stays reachable through
//! [`MongoAdapter::client`] for anything richer.

pub mod adapter;
pub mod codec;
pub mod config;

pub use adapter::MongoAdapter;
pub use config::MongoConfig;
