//! Connection manager
//!
//! Owns the set of adapter instances for one epoch: bulk connect at
//! `initialize`, concurrent lookups in between, bulk disconnect at shutdown.
//! Every fan-out is all-complete and failure-isolated: one slow or failing
//! backend never delays, aborts, or hides its siblings.

use std::collections::{BTreeMap, HashMap};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{AdapterRegistry, BoxedAdapter};

/// Configuration for one provider: its registry kind plus the opaque,
/// kind-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider kind as registered in the registry (e.g. "postgres").
    pub provider: String,

    /// Kind-specific settings, validated only by the adapter constructor.
    #[serde(flatten)]
    pub settings: serde_json::Value,
}

/// Manager configuration: named providers plus an optional default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Name of the provider consulted when a caller does not pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Provider name to provider configuration.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderEntry>,
}

impl ManagerConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default provider name.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Add a provider.
    #[must_use]
    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        settings: serde_json::Value,
    ) -> Self {
        self.providers.insert(
            name.into(),
            ProviderEntry {
                provider: kind.into(),
                settings,
            },
        );
        self
    }
}

/// Summary of one initialization fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Providers that connected and joined the live set.
    pub connected: Vec<String>,
    /// Providers that were constructed but failed to connect.
    pub failed: Vec<String>,
    /// Providers skipped before connect: unknown kind or invalid settings.
    pub skipped: Vec<String>,
}

impl InitReport {
    /// Check if every configured provider connected.
    pub fn all_connected(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Default)]
struct ManagerState {
    /// Every adapter constructed this epoch, including failed ones (a failed
    /// default must still resolve, surfacing NotConnected on use).
    instances: HashMap<String, BoxedAdapter>,
    /// Names whose connect succeeded, in configuration order.
    live: Vec<String>,
    default_provider: Option<String>,
    initialized: bool,
}

/// Owns the live adapter set and orchestrates bulk connect/disconnect.
///
/// One instance per process, constructed once and dependency-injected into
/// whatever needs data access. The adapter map is mutated only by
/// `initialize` and `disconnect`; lookups in between are concurrent-safe.
pub struct ConnectionManager {
    registry: AdapterRegistry,
    inner: RwLock<ManagerState>,
}

impl ConnectionManager {
    /// Create a manager over the given registry.
    #[must_use]
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            inner: RwLock::new(ManagerState::default()),
        }
    }

    /// Get the registry this manager constructs adapters from.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Check if `initialize` has completed for the current epoch.
    pub async fn is_initialized(&self) -> bool {
        self.inner.read().await.initialized
    }

    /// Construct and connect every configured provider.
    ///
    /// Unknown kinds and invalid settings are logged and skipped; connect
    /// failures are logged and excluded from the live set. All connect
    /// attempts run concurrently and the call waits for every one to settle.
    /// A second call while initialized is a warned no-op.
    ///
    /// No lock is held across the connect fan-out: the epoch is claimed up
    /// front, so concurrent lookups see an empty live set while connects are
    /// in flight instead of blocking on the slowest backend.
    #[instrument(skip_all)]
    pub async fn initialize(&self, config: ManagerConfig) -> InitReport {
        {
            let mut state = self.inner.write().await;
            if state.initialized {
                warn!("connection manager already initialized; ignoring initialize call");
                return InitReport::default();
            }
            state.initialized = true;
        }

        let mut report = InitReport::default();
        let mut built: Vec<BoxedAdapter> = Vec::new();

        for (name, entry) in &config.providers {
            match self.registry.build(&entry.provider, name, entry.settings.clone()) {
                Ok(adapter) => built.push(adapter),
                Err(err) => {
                    error!(
                        provider = %name,
                        kind = %entry.provider,
                        error = %err,
                        "skipping provider: construction failed"
                    );
                    report.skipped.push(name.clone());
                }
            }
        }

        // Fan out every connect and wait for all of them to settle.
        let outcomes = join_all(built.into_iter().map(|adapter| async move {
            let result = adapter.connect().await;
            (adapter, result)
        }))
        .await;

        let mut instances: HashMap<String, BoxedAdapter> = HashMap::new();
        let mut live: Vec<String> = Vec::new();

        for (adapter, result) in outcomes {
            let name = adapter.name().to_string();
            match result {
                Ok(()) => {
                    info!(provider = %name, kind = %adapter.kind(), "provider connected");
                    live.push(name.clone());
                    report.connected.push(name.clone());
                    instances.insert(name, adapter);
                }
                Err(err) => {
                    error!(
                        provider = %name,
                        kind = %adapter.kind(),
                        error = %err,
                        "provider failed to connect; excluded from live set"
                    );
                    report.failed.push(name.clone());
                    // Retained so a configured default still resolves to it.
                    instances.insert(name, adapter);
                }
            }
        }

        // A default must name a configured provider; anything else is a
        // configuration mistake we surface once, here.
        let default_provider = match config.default {
            Some(name) if config.providers.contains_key(&name) => Some(name),
            Some(name) => {
                warn!(
                    provider = %name,
                    "configured default does not name a configured provider; ignored"
                );
                None
            }
            None => None,
        };

        // Commit under a short write section.
        {
            let mut state = self.inner.write().await;
            state.instances = instances;
            state.live = live;
            state.default_provider = default_provider;
        }

        info!(
            connected = report.connected.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "connection manager initialized"
        );

        report
    }

    /// Names of the currently live providers, in configuration order.
    pub async fn providers(&self) -> Vec<String> {
        self.inner.read().await.live.clone()
    }

    /// Get the live adapter for a provider name.
    ///
    /// The failure message enumerates the currently live names.
    pub async fn get(&self, name: &str) -> AdapterResult<BoxedAdapter> {
        let state = self.inner.read().await;
        if state.live.iter().any(|live| live == name) {
            if let Some(adapter) = state.instances.get(name) {
                return Ok(adapter.clone());
            }
        }
        Err(AdapterError::unknown_adapter(
            name,
            state.live.iter().map(String::as_str),
        ))
    }

    /// Resolve the default adapter.
    ///
    /// A configured default resolves even when its connect failed, so
    /// operations on it surface `NotConnected` rather than silently running
    /// against a different provider. Without a configured default the first
    /// live provider (configuration order) is used.
    pub async fn default_adapter(&self) -> AdapterResult<BoxedAdapter> {
        let state = self.inner.read().await;

        if let Some(name) = &state.default_provider {
            if let Some(adapter) = state.instances.get(name) {
                return Ok(adapter.clone());
            }
            // Configured default was skipped at construction time.
            return Err(AdapterError::unknown_adapter(
                name.clone(),
                state.live.iter().map(String::as_str),
            ));
        }

        match state.live.first() {
            Some(name) => Ok(state.instances[name].clone()),
            None => Err(AdapterError::NoAdaptersAvailable),
        }
    }

    /// Run every live adapter's health check concurrently.
    ///
    /// Returns one boolean per live provider; a slow or failing adapter never
    /// suppresses the other entries.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let adapters: Vec<BoxedAdapter> = {
            let state = self.inner.read().await;
            state
                .live
                .iter()
                .filter_map(|name| state.instances.get(name).cloned())
                .collect()
        };

        join_all(adapters.into_iter().map(|adapter| async move {
            let healthy = adapter.health_check().await;
            (adapter.name().to_string(), healthy)
        }))
        .await
        .into_iter()
        .collect()
    }

    /// Disconnect every adapter instance concurrently and reset the epoch.
    ///
    /// Per-adapter errors are logged, never raised. Afterwards `providers()`
    /// is empty and the manager may be initialized again. The epoch is reset
    /// before the fan-out, so no lock is held across the disconnect I/O.
    #[instrument(skip_all)]
    pub async fn disconnect(&self) {
        let adapters: Vec<BoxedAdapter> = {
            let mut state = self.inner.write().await;
            state.live.clear();
            state.default_provider = None;
            state.initialized = false;
            std::mem::take(&mut state.instances).into_values().collect()
        };

        let outcomes = join_all(adapters.into_iter().map(|adapter| async move {
            let result = adapter.disconnect().await;
            (adapter, result)
        }))
        .await;

        for (adapter, result) in outcomes {
            if let Err(err) = result {
                error!(
                    provider = %adapter.name(),
                    error = %err,
                    "disconnect failed; continuing"
                );
            }
        }

        info!("connection manager disconnected");
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("registry", &self.registry)
            .finish()
    }
}
