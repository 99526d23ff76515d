//! End-to-end runs of the manager over real backends: in-memory SQLite and a
//! local mock HTTP service, mixed with deliberately broken providers.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use polystore::prelude::*;
use polystore::{default_registry, SqliteAdapter};

async fn healthy_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn mixed_fleet_startup_and_shutdown() {
    let server = healthy_server().await;
    let manager = ConnectionManager::new(default_registry());

    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_default("cache")
                .with_provider("cache", "sqlite", serde_json::json!({"path": ":memory:"}))
                .with_provider("billing", "http", serde_json::json!({"base_url": server.uri()}))
                // missing required fields: constructed never, skipped
                .with_provider("broken", "postgres", serde_json::json!({"host": "db"}))
                // nobody registered this kind
                .with_provider("graph", "neo4j", serde_json::json!({})),
        )
        .await;

    assert_eq!(report.connected, vec!["billing", "cache"]);
    assert_eq!(report.skipped, vec!["broken", "graph"]);
    assert!(report.failed.is_empty());
    assert!(!report.all_connected());

    assert_eq!(manager.providers().await, vec!["billing", "cache"]);

    let health = manager.health_check().await;
    assert_eq!(health.len(), 2);
    assert!(health["cache"]);
    assert!(health["billing"]);

    manager.disconnect().await;
    manager.disconnect().await;
    assert!(!manager.is_initialized().await);
}

#[tokio::test]
async fn sql_through_the_manager() {
    let manager = ConnectionManager::new(default_registry());
    manager
        .initialize(
            ManagerConfig::new().with_provider(
                "cache",
                "sqlite",
                serde_json::json!({"path": ":memory:", "connection": {"pool_size": 1}}),
            ),
        )
        .await;

    let adapter = manager.default_adapter().await.unwrap();
    let sql = require_sql(adapter.as_ref()).unwrap();

    sql.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)", &[])
        .await
        .unwrap();
    sql.execute(
        "INSERT INTO kv (k, v) VALUES (?, ?)",
        &["greeting".into(), "hello".into()],
    )
    .await
    .unwrap();

    let rows = sql
        .query("SELECT v FROM kv WHERE k = ?", &["greeting".into()])
        .await
        .unwrap();
    assert_eq!(rows[0].get_str("v"), Some("hello"));

    // transactions compose with manager-held adapters
    let result: AdapterResult<()> = with_transaction(sql, |tx| {
        Box::pin(async move {
            tx.execute("DELETE FROM kv", &[]).await?;
            Err(AdapterError::operation_failed("abort"))
        })
    })
    .await;
    assert!(result.is_err());

    let rows = sql.query("SELECT * FROM kv", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn capability_mismatch_is_a_clean_error() {
    let server = healthy_server().await;
    let manager = ConnectionManager::new(default_registry());
    manager
        .initialize(
            ManagerConfig::new()
                .with_provider("cache", "sqlite", serde_json::json!({"path": ":memory:"}))
                .with_provider("billing", "http", serde_json::json!({"base_url": server.uri()})),
        )
        .await;

    let billing = manager.get("billing").await.unwrap();
    let err = require_sql(billing.as_ref()).unwrap_err();
    assert!(matches!(err, AdapterError::CapabilityMismatch { .. }));
    assert!(err.to_string().contains("billing"));

    let cache = manager.get("cache").await.unwrap();
    let err = require_document(cache.as_ref()).unwrap_err();
    assert!(err.to_string().contains("document"));
}

#[tokio::test]
async fn unreachable_http_backend_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(default_registry());
    let report = manager
        .initialize(
            ManagerConfig::new()
                .with_default("flaky")
                .with_provider("flaky", "http", serde_json::json!({"base_url": server.uri()}))
                .with_provider("cache", "sqlite", serde_json::json!({"path": ":memory:"})),
        )
        .await;

    assert_eq!(report.connected, vec!["cache"]);
    assert_eq!(report.failed, vec!["flaky"]);

    // the configured default resolves even though it failed; its state says so
    let adapter = manager.default_adapter().await.unwrap();
    assert_eq!(adapter.name(), "flaky");
    assert_eq!(adapter.state(), ConnectionState::Failed);

    // the failed provider is not in the live set
    assert!(manager.get("flaky").await.is_err());
    assert!(manager.get("cache").await.is_ok());
}

#[tokio::test]
async fn native_handle_through_the_manager() {
    let manager = ConnectionManager::new(default_registry());
    manager
        .initialize(
            ManagerConfig::new().with_provider(
                "cache",
                "sqlite",
                serde_json::json!({"path": ":memory:", "connection": {"pool_size": 1}}),
            ),
        )
        .await;

    let adapter = manager.get("cache").await.unwrap();
    let sqlite = adapter
        .as_any()
        .downcast_ref::<SqliteAdapter>()
        .expect("sqlite adapter");
    let pool = sqlite.pool().await.unwrap();

    let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
    assert_eq!(one, 1);
}

#[tokio::test]
async fn fresh_epoch_after_disconnect() {
    let manager = ConnectionManager::new(default_registry());
    let config = ManagerConfig::new().with_provider(
        "cache",
        "sqlite",
        serde_json::json!({"path": ":memory:"}),
    );

    manager.initialize(config.clone()).await;
    let first = manager.get("cache").await.unwrap();
    manager.disconnect().await;
    assert_eq!(first.state(), ConnectionState::Disconnected);

    let report = manager.initialize(config).await;
    assert_eq!(report.connected, vec!["cache"]);
    let second = manager.get("cache").await.unwrap();
    assert!(second.is_connected());
}
