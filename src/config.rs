//! Provider configuration — loaded at startup, replaceable at runtime
//!
//! In-flight dispatches use a snapshot captured at dispatch time, never a
//! value read mid-flight. A rejected update leaves the previous configuration
//! active.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cache entry lifetime: 24 hours
pub const DEFAULT_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Errors from configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("remote mode requires an endpoint")]
    MissingEndpoint,

    #[error("remote mode requires a credential")]
    MissingCredential,

    #[error("ttl must be greater than zero")]
    ZeroTtl,
}

/// Which classification provider variant is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Local,
    Remote,
}

/// Process-wide provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub mode: ProviderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub cache_enabled: bool,
    pub ttl_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Local,
            endpoint: None,
            credential: None,
            cache_enabled: true,
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

impl ProviderConfig {
    /// Check the configuration is usable before it replaces the active one
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.mode == ProviderMode::Remote {
            if self.endpoint.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingEndpoint);
            }
            if self.credential.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingCredential);
            }
        }
        Ok(())
    }

    /// Cache entry lifetime as a duration
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.ttl_ms as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_local() {
        let config = ProviderConfig::default();
        assert_eq!(config.mode, ProviderMode::Local);
        assert!(config.cache_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn remote_requires_endpoint_and_credential() {
        let config = ProviderConfig {
            mode: ProviderMode::Remote,
            ..ProviderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingEndpoint));

        let config = ProviderConfig {
            mode: ProviderMode::Remote,
            endpoint: Some("https://api.example.com".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingCredential));

        let config = ProviderConfig {
            mode: ProviderMode::Remote,
            endpoint: Some("https://api.example.com".to_string()),
            credential: Some("key".to_string()),
            ..ProviderConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let config = ProviderConfig {
            mode: ProviderMode::Remote,
            endpoint: Some(String::new()),
            credential: Some("key".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingEndpoint));
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = ProviderConfig {
            ttl_ms: 0,
            ..ProviderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTtl));
    }

    #[test]
    fn serde_uses_camel_case_keys() {
        let config = ProviderConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["mode"], "local");
        assert!(json.get("cacheEnabled").is_some());
        assert!(json.get("ttlMs").is_some());
        assert!(json.get("endpoint").is_none());
    }
}
