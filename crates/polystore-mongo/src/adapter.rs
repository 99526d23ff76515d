//! MongoDB adapter
//!
//! Wraps a `mongodb::Client` behind the document capability. The connect step
//! issues a `ping` so a wrong address fails at initialization instead of on
//! the first query.

use std::any::Any;
use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use polystore_core::async_trait;
use polystore_core::config::AdapterConfig;
use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::registry::BoxedAdapter;
use polystore_core::traits::{Adapter, DocumentAdapter, DocumentCollection, WriteOutcome};
use polystore_core::types::{Capability, ConnectionState, StateCell};
use polystore_core::value::{Filter, Record, Value};

use crate::codec::{
    bson_to_value, changes_to_update, document_to_record, filter_to_document, record_to_document,
};
use crate::config::MongoConfig;

struct Handle {
    client: Client,
    database: Database,
}

/// Adapter for the `mongodb` provider kind.
pub struct MongoAdapter {
    name: String,
    config: MongoConfig,
    state: StateCell,
    handle: RwLock<Option<Handle>>,
}

impl MongoAdapter {
    /// Create an unconnected adapter from validated config.
    pub fn new(name: impl Into<String>, config: MongoConfig) -> AdapterResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            state: StateCell::new(),
            handle: RwLock::new(None),
        })
    }

    /// Registry constructor: deserialize settings, validate, box.
    pub fn from_settings(name: &str, settings: serde_json::Value) -> AdapterResult<BoxedAdapter> {
        let config: MongoConfig = serde_json::from_value(settings)?;
        Ok(Arc::new(Self::new(name, config)?))
    }

    /// Get the native client.
    pub async fn client(&self) -> AdapterResult<Client> {
        self.handle
            .read()
            .await
            .as_ref()
            .map(|handle| handle.client.clone())
            .ok_or_else(|| AdapterError::not_connected(&self.name))
    }

    /// Get the native database handle.
    pub async fn database(&self) -> AdapterResult<Database> {
        self.handle
            .read()
            .await
            .as_ref()
            .map(|handle| handle.database.clone())
            .ok_or_else(|| AdapterError::not_connected(&self.name))
    }
}

#[async_trait]
impl Adapter for MongoAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "mongodb"
    }

    fn capability(&self) -> Capability {
        Capability::Document
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
        let mut options = match ClientOptions::parse(&self.config.uri).await {
            Ok(options) => options,
            Err(err) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    "invalid mongodb connection string",
                    err,
                ));
            }
        };
        options.connect_timeout = Some(settings.connection_timeout());
        options.server_selection_timeout = Some(settings.connection_timeout());
        options.max_pool_size = Some(settings.pool_size);

        let database_name = match self
            .config
            .database
            .clone()
            .or_else(|| options.default_database.clone())
        {
            Some(name) => name,
            None => {
                self.state.mark_failed();
                return Err(AdapterError::invalid_config(
                    "no database configured and the uri names none",
                ));
            }
        };

        let client = match Client::with_options(options) {
            Ok(client) => client,
            Err(err) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    "mongodb client construction failed",
                    err,
                ));
            }
        };
        let database = client.database(&database_name);

        // Round trip now so a bad address is a connect failure, not a
        // deferred operation failure.
        let ping = database.run_command(doc! {"ping": 1}, None);
        match tokio::time::timeout(settings.connection_timeout(), ping).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                self.state.mark_failed();
                return Err(AdapterError::connection_failed_with_source(
                    "mongodb ping failed",
                    err,
                ));
            }
            Err(_) => {
                self.state.mark_failed();
                return Err(AdapterError::ConnectionTimeout {
                    timeout_secs: settings.connection_timeout_secs,
                });
            }
        }

        *self.handle.write().await = Some(Handle { client, database });
        self.state.mark_connected();
        info!(database = %database_name, "mongodb adapter connected");
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn disconnect(&self) -> AdapterResult<()> {
        if let Some(handle) = self.handle.write().await.take() {
            handle.client.shutdown().await;
            debug!("mongodb client shut down");
        }
        self.state.mark_disconnected();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let database = match self.database().await {
            Ok(database) => database,
            Err(_) => return false,
        };
        match database.run_command(doc! {"ping": 1}, None).await {
            Ok(_) => true,
            Err(err) => {
                warn!(provider = %self.name, error = %err, "mongodb health check failed");
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_document(&self) -> Option<&dyn DocumentAdapter> {
        Some(self)
    }
}

#[async_trait]
impl DocumentAdapter for MongoAdapter {
    async fn collection(&self, name: &str) -> AdapterResult<Box<dyn DocumentCollection>> {
        let database = self.database().await?;
        Ok(Box::new(MongoCollection {
            name: name.to_string(),
            collection: database.collection(name),
        }))
    }
}

/// One collection handle, valid for the adapter's current epoch.
struct MongoCollection {
    name: String,
    collection: Collection<Document>,
}

impl MongoCollection {
    fn query(&self, filter: Option<&Filter>) -> Option<Document> {
        filter.map(filter_to_document)
    }
}

fn op_err(context: &str, err: mongodb::error::Error) -> AdapterError {
    AdapterError::operation_failed_with_source(context.to_string(), err)
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, filter), fields(collection = %self.name))]
    async fn find(&self, filter: Option<&Filter>) -> AdapterResult<Vec<Record>> {
        let mut cursor = self
            .collection
            .find(self.query(filter), None)
            .await
            .map_err(|err| op_err("find failed", err))?;

        let mut records = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|err| op_err("cursor read failed", err))?
        {
            records.push(document_to_record(doc));
        }
        Ok(records)
    }

    async fn find_one(&self, filter: &Filter) -> AdapterResult<Option<Record>> {
        let doc = self
            .collection
            .find_one(filter_to_document(filter), None)
            .await
            .map_err(|err| op_err("find_one failed", err))?;
        Ok(doc.map(document_to_record))
    }

    #[instrument(skip(self, document), fields(collection = %self.name))]
    async fn insert_one(&self, document: Record) -> AdapterResult<Value> {
        let result = self
            .collection
            .insert_one(record_to_document(&document), None)
            .await
            .map_err(|err| op_err("insert_one failed", err))?;
        Ok(bson_to_value(result.inserted_id))
    }

    async fn insert_many(&self, documents: Vec<Record>) -> AdapterResult<u64> {
        if documents.is_empty() {
            return Ok(0);
        }
        let docs: Vec<Document> = documents.iter().map(record_to_document).collect();
        let result = self
            .collection
            .insert_many(docs, None)
            .await
            .map_err(|err| op_err("insert_many failed", err))?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn update_one(&self, filter: &Filter, changes: Record) -> AdapterResult<WriteOutcome> {
        let update = changes_to_update(&changes)?;
        let result = self
            .collection
            .update_one(filter_to_document(filter), update, None)
            .await
            .map_err(|err| op_err("update_one failed", err))?;
        Ok(WriteOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn update_many(&self, filter: &Filter, changes: Record) -> AdapterResult<WriteOutcome> {
        let update = changes_to_update(&changes)?;
        let result = self
            .collection
            .update_many(filter_to_document(filter), update, None)
            .await
            .map_err(|err| op_err("update_many failed", err))?;
        Ok(WriteOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: &Filter) -> AdapterResult<u64> {
        let result = self
            .collection
            .delete_one(filter_to_document(filter), None)
            .await
            .map_err(|err| op_err("delete_one failed", err))?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: &Filter) -> AdapterResult<u64> {
        let result = self
            .collection
            .delete_many(filter_to_document(filter), None)
            .await
            .map_err(|err| op_err("delete_many failed", err))?;
        Ok(result.deleted_count)
    }

    async fn count(&self, filter: Option<&Filter>) -> AdapterResult<u64> {
        self.collection
            .count_documents(self.query(filter), None)
            .await
            .map_err(|err| op_err("count failed", err))
    }
}
