//! Managed HTTP service adapter
//!
//! Opaque capability: there is no portable query surface for an arbitrary
//! HTTP API, so this adapter standardizes lifecycle and health only and
//! exposes the configured `reqwest::Client` as the native handle. Auth is
//! installed as default headers, so raw requests through the native client
//! are authenticated too.

use std::any::Any;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use polystore_core::async_trait;
use polystore_core::config::AdapterConfig;
use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::registry::BoxedAdapter;
use polystore_core::traits::Adapter;
use polystore_core::types::{Capability, ConnectionState, StateCell};

use crate::config::{AuthMethod, CloudConfig};

/// Adapter for the `http` provider kind.
pub struct CloudAdapter {
    name: String,
    config: CloudConfig,
    state: StateCell,
    client: RwLock<Option<reqwest::Client>>,
}

impl CloudAdapter {
    /// Create an unconnected adapter from validated config.
    pub fn new(name: impl Into<String>, config: CloudConfig) -> AdapterResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            state: StateCell::new(),
            client: RwLock::new(None),
        })
    }

    /// Registry constructor: deserialize settings, validate, box.
    pub fn from_settings(name: &str, settings: serde_json::Value) -> AdapterResult<BoxedAdapter> {
        let config: CloudConfig = serde_json::from_value(settings)?;
        Ok(Arc::new(Self::new(name, config)?))
    }

    /// Get the native HTTP client, with auth headers installed.
    pub async fn client(&self) -> AdapterResult<reqwest::Client> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| AdapterError::not_connected(&self.name))
    }

    /// Base URL this adapter is configured against.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build a full URL for a service path.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.base_url)
        } else {
            format!("{}/{path}", self.config.base_url)
        }
    }

    fn auth_headers(&self) -> AdapterResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Basic { username, password } => {
                let encoded = BASE64.encode(format!("{username}:{password}"));
                let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
                    .map_err(|err| {
                        AdapterError::operation_failed_with_source("invalid basic credentials", err)
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            AuthMethod::Bearer { token } => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|err| {
                        AdapterError::operation_failed_with_source("invalid bearer token", err)
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            AuthMethod::ApiKey { key, header_name } => {
                let name = HeaderName::from_bytes(header_name.as_bytes()).map_err(|err| {
                    AdapterError::operation_failed_with_source("invalid api key header name", err)
                })?;
                let mut value = HeaderValue::from_str(key).map_err(|err| {
                    AdapterError::operation_failed_with_source("invalid api key", err)
                })?;
                value.set_sensitive(true);
                headers.insert(name, value);
            }
        }
        Ok(headers)
    }

    async fn probe(&self, client: &reqwest::Client) -> AdapterResult<()> {
        let url = self.endpoint(&self.config.health_path);
        let response = client.get(&url).send().await.map_err(|err| {
            AdapterError::connection_failed_with_source(format!("probe of {url} failed"), err)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::connection_failed(format!(
                "probe of {url} returned {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for CloudAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn capability(&self) -> Capability {
        Capability::Opaque
    }

    fn state(&self) -> ConnectionState {
        self.state.state()
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn connect(&self) -> AdapterResult<()> {
        self.state.begin_connect().map_err(|state| {
            AdapterError::operation_failed(format!("cannot connect from state {state}"))
        })?;

        let build = || -> AdapterResult<reqwest::Client> {
            let settings = &self.config.connection;
            reqwest::Client::builder()
                .default_headers(self.auth_headers()?)
                .connect_timeout(settings.connection_timeout())
                .timeout(settings.read_timeout())
                .build()
                .map_err(|err| {
                    AdapterError::connection_failed_with_source("http client build failed", err)
                })
        };

        let client = match build() {
            Ok(client) => client,
            Err(err) => {
                self.state.mark_failed();
                return Err(err);
            }
        };

        // HTTP has no session to open; reachability comes from the probe.
        if let Err(err) = self.probe(&client).await {
            self.state.mark_failed();
            return Err(err);
        }

        *self.client.write().await = Some(client);
        self.state.mark_connected();
        info!(base_url = %self.config.base_url, "http adapter connected");
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn disconnect(&self) -> AdapterResult<()> {
        self.client.write().await.take();
        self.state.mark_disconnected();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let client = match self.client.read().await.clone() {
            Some(client) => client,
            None => return false,
        };
        match self.probe(&client).await {
            Ok(()) => true,
            Err(err) => {
                warn!(provider = %self.name, error = %err, "http health check failed");
                false
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
