//! Adapter registry
//!
//! Static mapping from provider kind to a constructor that validates the
//! provider-specific settings and yields an unconnected adapter. Applications
//! (and tests) can register additional kinds through the same interface the
//! built-in backends use.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AdapterError, AdapterResult};
use crate::traits::Adapter;

/// Shared handle to an adapter instance.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Constructor for one provider kind.
///
/// Receives the configured provider name and its opaque settings; returns an
/// unconnected adapter or a configuration error.
pub type AdapterConstructor =
    Arc<dyn Fn(&str, serde_json::Value) -> AdapterResult<BoxedAdapter> + Send + Sync>;

/// Registry of adapter constructors, keyed by provider kind.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    constructors: HashMap<String, AdapterConstructor>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a provider kind.
    ///
    /// Re-registering a kind replaces the previous constructor.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&str, serde_json::Value) -> AdapterResult<BoxedAdapter> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Arc::new(constructor));
    }

    /// Check whether a constructor is registered for the kind.
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// List the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build an unconnected adapter for the kind.
    ///
    /// Configuration validation happens inside the constructor; an unknown
    /// kind is `UnsupportedProvider`.
    pub fn build(
        &self,
        kind: &str,
        name: &str,
        settings: serde_json::Value,
    ) -> AdapterResult<BoxedAdapter> {
        let constructor =
            self.constructors
                .get(kind)
                .ok_or_else(|| AdapterError::UnsupportedProvider {
                    kind: kind.to_string(),
                })?;
        constructor(name, settings)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::types::{Capability, ConnectionState, StateCell};
    use async_trait::async_trait;

    struct NullAdapter {
        name: String,
        state: StateCell,
    }

    #[async_trait]
    impl Adapter for NullAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &'static str {
            "null"
        }

        fn capability(&self) -> Capability {
            Capability::Opaque
        }

        fn state(&self) -> ConnectionState {
            self.state.state()
        }

        async fn connect(&self) -> crate::error::AdapterResult<()> {
            self.state.begin_connect().ok();
            self.state.mark_connected();
            Ok(())
        }

        async fn disconnect(&self) -> crate::error::AdapterResult<()> {
            self.state.mark_disconnected();
            Ok(())
        }

        async fn health_check(&self) -> bool {
            self.state.is_connected()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn null_constructor(name: &str, settings: serde_json::Value) -> AdapterResult<BoxedAdapter> {
        if settings.get("fail").and_then(serde_json::Value::as_bool) == Some(true) {
            return Err(AdapterError::invalid_config("fail requested"));
        }
        Ok(Arc::new(NullAdapter {
            name: name.to_string(),
            state: StateCell::new(),
        }))
    }

    #[test]
    fn register_and_build() {
        let mut registry = AdapterRegistry::new();
        assert!(!registry.contains("null"));

        registry.register("null", null_constructor);
        assert!(registry.contains("null"));
        assert_eq!(registry.kinds(), vec!["null"]);

        let adapter = registry
            .build("null", "cache", serde_json::json!({}))
            .unwrap();
        assert_eq!(adapter.name(), "cache");
        assert_eq!(adapter.state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let registry = AdapterRegistry::new();
        let err = registry
            .build("graph", "g", serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedProvider { .. }));
    }

    #[test]
    fn constructor_validation_errors_propagate() {
        let mut registry = AdapterRegistry::new();
        registry.register("null", null_constructor);

        let err = registry
            .build("null", "bad", serde_json::json!({"fail": true}))
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidConfiguration { .. }));
    }
}
