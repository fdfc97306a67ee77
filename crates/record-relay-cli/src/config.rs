//! # Relay Configuration
//!
//! Layered configuration for the `record-relay` binary.
//!
//! Sources, later ones overriding earlier ones:
//!  1. `/etc/record-relay/relay.{toml,yaml,json}`   system-wide defaults
//!  2. `./config/relay.{toml,yaml,json}`             deployment-local override
//!  3. `--config` / `RECORD_RELAY_CONFIG`            operator-specified file (must exist)
//!  4. Environment variables prefixed `RELAY__`, e.g. `RELAY__STORE__TABLE_NAME=events`
//!  5. Legacy variables `TARGET_GRAPHQL_URL` and `DYNAMODB_TABLE_NAME`
//!
//! Every field carries a serde default, so an unconfigured environment still
//! deserializes; [`RelayConfig::validate`] decides whether it is usable.

use record_relay_core::{DecodeFailurePolicy, DeliveryClientConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System-wide and deployment-local configuration files, without extension
pub const DEFAULT_SEARCH_PATHS: [&str; 2] = ["/etc/record-relay/relay", "config/relay"];

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "RELAY";

/// Legacy variable overriding `delivery.endpoint`
pub const LEGACY_ENDPOINT_VAR: &str = "TARGET_GRAPHQL_URL";

/// Legacy variable overriding `store.table_name`
pub const LEGACY_TABLE_VAR: &str = "DYNAMODB_TABLE_NAME";

// ============================================================================
// Errors
// ============================================================================

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub delivery: DeliveryConfig,
    pub store: StoreConfig,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

/// Downstream GraphQL delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Target GraphQL endpoint; no default
    pub endpoint: String,

    /// Transport timeout for one delivery round trip
    pub timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let client_defaults = DeliveryClientConfig::default();
        Self {
            endpoint: String::new(),
            timeout_seconds: client_defaults.timeout.as_secs(),
            user_agent: client_defaults.user_agent,
        }
    }
}

impl DeliveryConfig {
    /// Settings for the HTTP delivery client
    pub fn client_config(&self) -> DeliveryClientConfig {
        DeliveryClientConfig {
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Status store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table_name: String,

    /// Root directory of the filesystem status store
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: "record-events".to_string(),
            data_dir: PathBuf::from("./data/status"),
        }
    }
}

/// Per-record processing behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Routing brand attached to every mutation
    pub brand: String,

    pub decode_failure_policy: DecodeFailurePolicy,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            brand: "testBrand".to_string(),
            decode_failure_policy: DecodeFailurePolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl RelayConfig {
    /// Check that the configuration can drive the pipeline
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delivery.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "delivery.endpoint".to_string(),
            });
        }

        match url::Url::parse(&self.delivery.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    key: "delivery.endpoint".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    key: "delivery.endpoint".to_string(),
                    message: e.to_string(),
                })
            }
        }

        if self.delivery.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "delivery.timeout_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.store.table_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "store.table_name".to_string(),
            });
        }

        if self.processing.brand.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "processing.brand".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load configuration from the default locations and the process environment
pub fn load_configuration(explicit_path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let environment: config::Map<String, String> = std::env::vars().collect();
    load_configuration_from(&DEFAULT_SEARCH_PATHS, explicit_path, &environment)
}

/// Load configuration from the given search paths and environment snapshot
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `explicit_path` does not exist, and
/// [`ConfigError::Load`] if a source is malformed or a value has the wrong type.
pub fn load_configuration_from(
    search_paths: &[&str],
    explicit_path: Option<&Path>,
    environment: &config::Map<String, String>,
) -> Result<RelayConfig, ConfigError> {
    let mut builder = config::Config::builder();

    for path in search_paths {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .source(Some(environment.clone())),
    );

    builder = builder
        .set_override_option("delivery.endpoint", non_empty(environment, LEGACY_ENDPOINT_VAR))?
        .set_override_option("store.table_name", non_empty(environment, LEGACY_TABLE_VAR))?;

    Ok(builder.build()?.try_deserialize()?)
}

fn non_empty(environment: &config::Map<String, String>, key: &str) -> Option<String> {
    environment.get(key).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
