//! Configuration data structures for Costforge
//!
//! This module defines the configuration schema for the ambient concerns
//! shared across `costforge` subcommands: where the plugin tree lives, how
//! the release client talks to the network, and how the process logs.

use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::path::PathBuf;

/// Root configuration structure for Costforge
///
/// Configuration sources are merged in this precedence (highest to lowest):
/// 1. CLI Arguments
/// 2. Environment Variables (COSTFORGE_ prefix)
/// 3. Config File (~/.config/costforge/config.toml)
/// 4. Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Plugin registry settings
    pub registry: RegistryConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Plugin registry configuration
///
/// Controls where installed plugins live on disk and how the release
/// client behaves when fetching catalog metadata and downloading assets.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root of the installed plugin tree, shaped `<root>/<name>/<version>/<binary>`
    ///
    /// Default: the platform config directory's `costforge/plugins` subdirectory
    pub root: PathBuf,

    /// Timeout in seconds for requests to the release host
    ///
    /// Default: 30 seconds
    #[validate(minimum = 1)]
    #[validate(maximum = 300)]
    pub http_timeout_seconds: u64,

    /// Maximum number of retry attempts for transient release-host failures
    ///
    /// Default: 3 retries
    #[validate(maximum = 10)]
    pub max_retries: u32,

    /// Recognize the legacy `cost-plugin-<name>` binary naming convention
    /// during discovery, in addition to `costforge-plugin-<name>`
    ///
    /// Default: false
    pub legacy_plugin_names: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: default_plugin_root(),
            http_timeout_seconds: 30,
            max_retries: 3,
            legacy_plugin_names: false,
        }
    }
}

fn default_plugin_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("costforge")
        .join("plugins")
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter directive, e.g. "info", "costforge=debug"
    ///
    /// Default: "info"
    #[validate(min_length = 1)]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_registry_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.http_timeout_seconds, 30);
        assert_eq!(config.max_retries, 3);
        assert!(!config.legacy_plugin_names);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        let deserialized: Config = toml::from_str(&toml_str).expect("Failed to deserialize");
        assert_eq!(config, deserialized);
    }
}
