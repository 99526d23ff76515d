//! HTTP service provider configuration

use serde::{Deserialize, Serialize};

use polystore_core::config::{AdapterConfig, ConnectionSettings, REDACTED};
use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::types::Capability;

/// Authentication method for HTTP providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthMethod {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic { username: String, password: String },
    /// Bearer token authentication.
    Bearer { token: String },
    /// API key sent in a request header.
    ApiKey {
        key: String,
        /// Header to carry the key ("X-API-Key" when absent).
        #[serde(default = "default_api_key_header")]
        header_name: String,
    },
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

/// Configuration for the `http` provider kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the service (scheme and authority, no trailing slash).
    pub base_url: String,

    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,

    /// Path probed by connect and health checks ("/health" when absent).
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Timeouts. `pool_size` is ignored; reqwest manages its own pool.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl CloudConfig {
    /// Create a new config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthMethod::None,
            health_path: default_health_path(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Set the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Set the health probe path.
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Set the connection settings.
    #[must_use]
    pub fn with_connection(mut self, settings: ConnectionSettings) -> Self {
        self.connection = settings;
        self
    }
}

impl AdapterConfig for CloudConfig {
    fn capability() -> Capability {
        Capability::Opaque
    }

    fn validate(&self) -> AdapterResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AdapterError::invalid_config(
                "base_url must start with http:// or https://",
            ));
        }
        if self.base_url.ends_with('/') {
            return Err(AdapterError::invalid_config(
                "base_url must not end with a slash",
            ));
        }
        if !self.health_path.starts_with('/') {
            return Err(AdapterError::invalid_config(
                "health_path must start with a slash",
            ));
        }
        match &self.auth {
            AuthMethod::None => {}
            AuthMethod::Basic { username, .. } => {
                if username.is_empty() {
                    return Err(AdapterError::invalid_config("basic auth username is empty"));
                }
            }
            AuthMethod::Bearer { token } => {
                if token.is_empty() {
                    return Err(AdapterError::invalid_config("bearer token is empty"));
                }
            }
            AuthMethod::ApiKey { key, header_name } => {
                if key.is_empty() {
                    return Err(AdapterError::invalid_config("api key is empty"));
                }
                if header_name.is_empty() {
                    return Err(AdapterError::invalid_config("api key header name is empty"));
                }
            }
        }
        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.auth = match config.auth {
            AuthMethod::None => AuthMethod::None,
            AuthMethod::Basic { username, .. } => AuthMethod::Basic {
                username,
                password: REDACTED.to_string(),
            },
            AuthMethod::Bearer { .. } => AuthMethod::Bearer {
                token: REDACTED.to_string(),
            },
            AuthMethod::ApiKey { header_name, .. } => AuthMethod::ApiKey {
                key: REDACTED.to_string(),
                header_name,
            },
        };
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(CloudConfig::new("https://api.example.com").validate().is_ok());
        assert!(CloudConfig::new("ftp://api.example.com").validate().is_err());
        assert!(CloudConfig::new("https://api.example.com/").validate().is_err());
        assert!(CloudConfig::new("https://x")
            .with_health_path("status")
            .validate()
            .is_err());
        assert!(CloudConfig::new("https://x")
            .with_auth(AuthMethod::Bearer { token: String::new() })
            .validate()
            .is_err());
    }

    #[test]
    fn secrets_are_redacted() {
        let config = CloudConfig::new("https://x").with_auth(AuthMethod::Basic {
            username: "svc".to_string(),
            password: "hunter2".to_string(),
        });
        match config.redacted().auth {
            AuthMethod::Basic { username, password } => {
                assert_eq!(username, "svc");
                assert_eq!(password, REDACTED);
            }
            other => panic!("unexpected auth: {other:?}"),
        }
    }

    #[test]
    fn deserializes_from_settings() {
        let config: CloudConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://api.example.com",
            "auth": {"method": "api_key", "key": "k-123"},
            "health_path": "/status",
        }))
        .unwrap();
        assert_eq!(config.health_path, "/status");
        match config.auth {
            AuthMethod::ApiKey { key, header_name } => {
                assert_eq!(key, "k-123");
                assert_eq!(header_name, "X-API-Key");
            }
            other => panic!("unexpected auth: {other:?}"),
        }
    }
}
