//! Bring up a small backend fleet, run a query, and shut down.
//!
//! Run with: cargo run -p polystore --example fleet

use polystore::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let manager = ConnectionManager::new(polystore::default_registry());

    let config = ManagerConfig::new()
        .with_default("cache")
        .with_provider("cache", "sqlite", serde_json::json!({"path": ":memory:"}))
        // Fails to connect unless something is listening; the cache stays up.
        .with_provider(
            "billing",
            "http",
            serde_json::json!({"base_url": "http://127.0.0.1:9100", "connection": {"connection_timeout_secs": 2}}),
        );

    let report = manager.initialize(config).await;
    tracing::info!(
        connected = ?report.connected,
        failed = ?report.failed,
        skipped = ?report.skipped,
        "fleet initialized"
    );

    let adapter = manager.default_adapter().await?;
    let sql = require_sql(adapter.as_ref())?;
    sql.execute("CREATE TABLE greetings (lang TEXT, text TEXT)", &[])
        .await?;
    sql.execute(
        "INSERT INTO greetings (lang, text) VALUES (?, ?)",
        &["en".into(), "hello".into()],
    )
    .await?;

    for row in sql.query("SELECT lang, text FROM greetings", &[]).await? {
        tracing::info!(
            lang = row.get_str("lang"),
            text = row.get_str("text"),
            "row"
        );
    }

    for (provider, healthy) in manager.health_check().await {
        tracing::info!(%provider, healthy, "health");
    }

    manager.disconnect().await;
    Ok(())
}
