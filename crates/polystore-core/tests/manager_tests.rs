//! Connection manager behavior against mock backends.
//!
//! These tests register mock provider kinds through the public registry, the
//! same way real backend crates do, and verify failure isolation, default
//! resolution, and lifecycle invariants without any external services.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use polystore_core::async_trait;
use polystore_core::prelude::*;

/// Settings for the mock kind: whether construction/connect should fail, how
/// slow connect is, and what the health check reports.
#[derive(Debug, Clone, Deserialize)]
struct MockSettings {
    #[serde(default)]
    fail_construct: bool,
    #[serde(default)]
    fail_connect: bool,
    #[serde(default)]
    connect_delay_ms: u64,
    #[serde(default)]
    healthy: Option<bool>,
}

struct MockAdapter {
    name: String,
    settings: MockSettings,
    state: StateCell,
    healthy: AtomicBool,
    disconnects: AtomicUsize,
}

impl MockAdapter {
    fn construct(name: &str, settings: serde_json::Value) -> AdapterResult<BoxedAdapter> {
        let settings: MockSettings = serde_json::from_value(settings)?;
        if settings.fail_construct {
            return Err(AdapterError::invalid_config("mock: required field missing"));
        }
        let healthy = settings.healthy.unwrap_or(true);
        Ok(Arc::new(MockAdapter {
            name: name.to_string(),
            settings,
            state: StateCell::new(),
            healthy: AtomicBool::new(healthy),
            disconnects: AtomicUsize::new(0),
        }))
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn capability(&self) -> Capability {
        Capability::Opaque
    }

    fn state(&self) -> ConnectionState {
        self.state.state()
    }

    async fn connect(&self) -> AdapterResult<()> {
        self.state.begin_connect().map_err(|state| {
            AdapterError::operation_failed(format!("cannot connect from state {state}"))
        })?;

        if self.settings.connect_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.connect_delay_ms)).await;
        }

        if self.settings.fail_connect {
            self.state.mark_failed();
            return Err(AdapterError::connection_failed("mock: connection refused"));
        }

        self.state.mark_connected();
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.mark_disconnected();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.state.is_connected() && self.healthy.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn mock_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register("mock", MockAdapter::construct);
    registry
}

fn manager() -> ConnectionManager {
    ConnectionManager::new(mock_registry())
}

#[tokio::test]
async fn invalid_provider_does_not_abort_siblings() {
    let manager = manager();
    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_default("a")
                .with_provider("a", "mock", json!({}))
                .with_provider("b", "mock", json!({"fail_construct": true})),
        )
        .await;

    assert_eq!(report.connected, vec!["a"]);
    assert_eq!(report.skipped, vec!["b"]);
    assert!(report.failed.is_empty());

    assert_eq!(manager.providers().await, vec!["a"]);
    assert!(manager.get("a").await.is_ok());

    let err = manager.get("b").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'b'"), "message: {message}");
    assert!(message.contains("available: a"), "message: {message}");
}

#[tokio::test]
async fn connect_failure_is_isolated() {
    let manager = manager();
    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_provider("up", "mock", json!({}))
                .with_provider("down", "mock", json!({"fail_connect": true})),
        )
        .await;

    assert_eq!(report.connected, vec!["up"]);
    assert_eq!(report.failed, vec!["down"]);

    assert_eq!(manager.providers().await, vec!["up"]);
    assert!(manager.get("down").await.is_err());
    assert!(manager.is_initialized().await);
}

#[tokio::test]
async fn slow_backend_does_not_block_fanout_result() {
    let manager = manager();
    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_provider("fast", "mock", json!({}))
                .with_provider(
                    "slow",
                    "mock",
                    json!({"connect_delay_ms": 50, "fail_connect": true}),
                ),
        )
        .await;

    // all-complete policy: the failing slow backend settles, the fast one
    // is connected, nothing is aborted early.
    assert_eq!(report.connected, vec!["fast"]);
    assert_eq!(report.failed, vec!["slow"]);
}

#[tokio::test]
async fn lookups_do_not_block_on_a_slow_connect() {
    let manager = Arc::new(manager());
    let task = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move {
            manager
                .initialize(
                    ManagerConfig::new()
                        .with_provider("slow", "mock", json!({"connect_delay_ms": 300})),
                )
                .await
        }
    });

    // Let the connect fan-out get in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // No lock is held across the fan-out: lookups settle immediately against
    // the still-empty live set instead of waiting out the slow backend.
    let providers = tokio::time::timeout(Duration::from_millis(50), manager.providers())
        .await
        .expect("providers() blocked during connect fan-out");
    assert!(providers.is_empty());

    let health = tokio::time::timeout(Duration::from_millis(50), manager.health_check())
        .await
        .expect("health_check() blocked during connect fan-out");
    assert!(health.is_empty());

    let report = task.await.unwrap();
    assert_eq!(report.connected, vec!["slow"]);
    assert_eq!(manager.providers().await, vec!["slow"]);
}

#[tokio::test]
async fn unknown_kind_is_skipped() {
    let manager = manager();
    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_provider("a", "mock", json!({}))
                .with_provider("weird", "graph", json!({})),
        )
        .await;

    assert_eq!(report.connected, vec!["a"]);
    assert_eq!(report.skipped, vec!["weird"]);
}

#[tokio::test]
async fn zero_live_adapters_still_initializes() {
    let manager = manager();
    let report = manager
        .initialize(
            ManagerConfig::new().with_provider("down", "mock", json!({"fail_connect": true})),
        )
        .await;

    assert!(report.connected.is_empty());
    assert!(manager.is_initialized().await);
    assert!(manager.providers().await.is_empty());

    let err = manager.default_adapter().await.unwrap_err();
    assert!(matches!(err, AdapterError::NoAdaptersAvailable));
}

#[tokio::test]
async fn default_without_configuration_is_first_live() {
    let manager = manager();
    manager
        .initialize(ManagerConfig::new().with_provider("only", "mock", json!({})))
        .await;

    let adapter = manager.default_adapter().await.unwrap();
    assert_eq!(adapter.name(), "only");
}

#[tokio::test]
async fn configured_default_resolves_even_when_connect_failed() {
    let manager = manager();
    manager
        .initialize(
            ManagerConfig::new()
                .with_default("primary")
                .with_provider("primary", "mock", json!({"fail_connect": true}))
                .with_provider("secondary", "mock", json!({})),
        )
        .await;

    // No silent substitution: the default resolves to the failed provider,
    // and its state makes the failure visible to the caller.
    let adapter = manager.default_adapter().await.unwrap();
    assert_eq!(adapter.name(), "primary");
    assert!(!adapter.is_connected());
    assert_eq!(adapter.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn default_naming_unconfigured_provider_is_ignored() {
    let manager = manager();
    manager
        .initialize(
            ManagerConfig::new()
                .with_default("ghost")
                .with_provider("real", "mock", json!({})),
        )
        .await;

    let adapter = manager.default_adapter().await.unwrap();
    assert_eq!(adapter.name(), "real");
}

#[tokio::test]
async fn second_initialize_is_a_noop() {
    let manager = manager();
    manager
        .initialize(ManagerConfig::new().with_provider("a", "mock", json!({})))
        .await;

    let report = manager
        .initialize(ManagerConfig::new().with_provider("b", "mock", json!({})))
        .await;

    assert!(report.connected.is_empty());
    assert_eq!(manager.providers().await, vec!["a"]);
}

#[tokio::test]
async fn health_check_is_per_adapter() {
    let manager = manager();
    manager
        .initialize(
            ManagerConfig::new()
                .with_provider("good", "mock", json!({}))
                .with_provider("bad", "mock", json!({"healthy": false}))
                .with_provider("down", "mock", json!({"fail_connect": true})),
        )
        .await;

    let health = manager.health_check().await;
    // one entry per live adapter; the failed one is not reported at all,
    // and the unhealthy one does not hide the healthy one.
    assert_eq!(health.len(), 2);
    assert_eq!(health["good"], true);
    assert_eq!(health["bad"], false);
    assert!(!health.contains_key("down"));
}

#[tokio::test]
async fn disconnect_is_idempotent_and_reenables_initialize() {
    let manager = manager();
    manager
        .initialize(ManagerConfig::new().with_provider("a", "mock", json!({})))
        .await;
    let adapter = manager.get("a").await.unwrap();

    manager.disconnect().await;
    assert!(manager.providers().await.is_empty());
    assert!(!manager.is_initialized().await);

    // Second disconnect completes without error against an empty set.
    manager.disconnect().await;
    assert!(manager.providers().await.is_empty());

    let mock = adapter.as_any().downcast_ref::<MockAdapter>().unwrap();
    assert_eq!(mock.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.state(), ConnectionState::Disconnected);

    // A new epoch builds fresh instances.
    let report = manager
        .initialize(ManagerConfig::new().with_provider("a", "mock", json!({})))
        .await;
    assert_eq!(report.connected, vec!["a"]);
    let fresh = manager.get("a").await.unwrap();
    assert!(fresh.is_connected());
}

#[tokio::test]
async fn get_after_disconnect_reports_unknown() {
    let manager = manager();
    manager
        .initialize(ManagerConfig::new().with_provider("a", "mock", json!({})))
        .await;
    manager.disconnect().await;

    let err = manager.get("a").await.unwrap_err();
    assert!(err.to_string().contains("available: none"));
}
