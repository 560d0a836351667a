//! Configuration management for Costforge
//!
//! This module provides a hierarchical configuration system with the following precedence:
//! 1. CLI Arguments (highest priority)
//! 2. Environment Variables (prefixed with COSTFORGE_)
//! 3. Config Files (~/.config/costforge/config.toml)
//! 4. Defaults (lowest priority)
//!
//! # Examples
//!
//! ```no_run
//! use costforge_core::config::ConfigLoader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration with all sources
//! let config = ConfigLoader::new().load()?;
//!
//! // Load from specific file
//! let config = ConfigLoader::new()
//!     .with_file("/path/to/config.toml")
//!     .load()?;
//!
//! // Load with environment variable overrides
//! std::env::set_var("COSTFORGE_REGISTRY__MAX_RETRIES", "5");
//! let config = ConfigLoader::new().load()?;
//! # Ok(())
//! # }
//! ```

pub mod models;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde_valid::Validate;
use std::path::{Path, PathBuf};

// Re-export all public types from models module
pub use models::{Config, LoggingConfig, RegistryConfig};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = "costforge";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "COSTFORGE";

/// Environment variable separator for nested configuration
/// Example: COSTFORGE_REGISTRY__MAX_RETRIES
const ENV_SEPARATOR: &str = "__";

/// Configuration loader with builder pattern
///
/// Provides a flexible way to load configuration from multiple sources
/// with proper precedence handling.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Optional custom configuration file path
    custom_file: Option<PathBuf>,
    /// Whether to skip loading from default config file
    skip_default_file: bool,
    /// Whether to skip loading from environment variables
    skip_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify a custom configuration file path
    ///
    /// This will be used instead of the default config file location.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skip loading from the default configuration file
    ///
    /// Useful for testing or when you want to use only environment variables
    pub fn skip_default_file(mut self) -> Self {
        self.skip_default_file = true;
        self
    }

    /// Skip loading from environment variables
    ///
    /// Useful for testing or when you want strict file-only configuration
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Load the configuration from all sources
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Defaults (from Config::default())
    /// 2. Config file (if exists)
    /// 3. Environment variables (if enabled)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file parsing fails
    /// - Environment variable format is invalid
    /// - Validation fails (required fields missing, invalid values, etc.)
    pub fn load(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::builder();

        // Start with defaults serialized to a map
        let defaults = Config::default();
        let defaults_map = config_to_map(&defaults)?;
        builder = builder.add_source(config::Config::try_from(&defaults_map)?);

        // Load from config file if not skipped
        if !self.skip_default_file {
            if let Some(config_path) = self.find_config_file() {
                tracing::debug!("Loading config from: {}", config_path.display());
                builder = builder.add_source(
                    File::from(config_path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            } else {
                tracing::debug!("No default config file found");
            }
        }

        // Load from custom file if specified
        if let Some(ref custom_path) = self.custom_file {
            tracing::info!("Loading custom config from: {}", custom_path.display());
            builder = builder.add_source(
                File::from(custom_path.as_ref())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        // Load from environment variables if not skipped
        if !self.skip_env {
            tracing::debug!("Loading config from environment variables");
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        // Build the configuration
        let config_result = builder.build().context("Failed to build configuration")?;

        // Deserialize into our Config struct
        let config: Config = config_result
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate the configuration
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        tracing::info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Find the default configuration file
    ///
    /// Searches in the following locations:
    /// 1. $XDG_CONFIG_HOME/costforge/config.toml (Linux)
    /// 2. ~/Library/Application Support/costforge/config.toml (macOS)
    /// 3. %APPDATA%/costforge/config.toml (Windows)
    /// 4. ./config.toml (current directory fallback)
    fn find_config_file(&self) -> Option<PathBuf> {
        // Try platform-specific config directory
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // Fallback to current directory
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        None
    }

    /// Get the default configuration directory path
    ///
    /// Returns the platform-specific configuration directory where
    /// the config file should be placed.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
    }

    /// Get the default configuration file path
    ///
    /// Returns the full path where the default config file is expected.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }
}

/// Helper function to convert Config to a HashMap for config builder
fn config_to_map(config: &Config) -> std::result::Result<serde_json::Value, ConfigError> {
    serde_json::to_value(config).map_err(|e| ConfigError::Foreign(Box::new(e)))
}

/// Initialize a default configuration file at the standard location
///
/// Creates the configuration directory if it doesn't exist and writes
/// a default configuration file.
///
/// # Errors
///
/// Returns an error if:
/// - Cannot determine config directory
/// - Cannot create directories
/// - Cannot write file
pub fn init_config_file() -> Result<PathBuf> {
    let config_dir =
        ConfigLoader::default_config_dir().context("Could not determine config directory")?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    let config_path = config_dir.join(CONFIG_FILE_NAME);

    // Don't overwrite existing config
    if config_path.exists() {
        anyhow::bail!("Config file already exists at: {}", config_path.display());
    }

    // Generate default config and write it
    let default_config = Config::default();
    let toml_content =
        toml::to_string_pretty(&default_config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_content).context("Failed to write config file")?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let loader = ConfigLoader::new().skip_default_file().skip_env();
        let config = loader.load().expect("Failed to load default config");

        assert_eq!(config.registry.http_timeout_seconds, 30);
        assert_eq!(config.registry.max_retries, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_custom_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let custom_config = r#"
[registry]
root = "/tmp/custom-plugins"
http_timeout_seconds = 60
max_retries = 5
legacy_plugin_names = true

[logging]
level = "debug"
        "#;

        std::fs::write(&config_path, custom_config).unwrap();

        let loader = ConfigLoader::new().with_file(&config_path).skip_env();
        let config = loader.load().expect("Failed to load custom config");

        assert_eq!(config.registry.http_timeout_seconds, 60);
        assert_eq!(config.registry.max_retries, 5);
        assert!(config.registry.legacy_plugin_names);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_environment_variable_override() {
        env::set_var("COSTFORGE_REGISTRY__MAX_RETRIES", "7");
        env::set_var("COSTFORGE_LOGGING__LEVEL", "trace");

        let loader = ConfigLoader::new().skip_default_file();
        let config = loader.load().expect("Failed to load config with env vars");

        assert_eq!(config.registry.max_retries, 7);
        assert_eq!(config.logging.level, "trace");

        env::remove_var("COSTFORGE_REGISTRY__MAX_RETRIES");
        env::remove_var("COSTFORGE_LOGGING__LEVEL");
    }

    #[test]
    fn test_precedence_env_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let file_config = r#"
[registry]
max_retries = 2
        "#;

        std::fs::write(&config_path, file_config).unwrap();

        env::set_var("COSTFORGE_REGISTRY__MAX_RETRIES", "9");

        let loader = ConfigLoader::new().with_file(&config_path);
        let config = loader.load().expect("Failed to load config");

        assert_eq!(config.registry.max_retries, 9);

        env::remove_var("COSTFORGE_REGISTRY__MAX_RETRIES");
    }

    #[test]
    fn test_validation_failure_invalid_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid_config.toml");

        // Timeout exceeds maximum of 300 seconds
        let invalid_config = r#"
[registry]
http_timeout_seconds = 500
        "#;

        std::fs::write(&config_path, invalid_config).unwrap();

        let loader = ConfigLoader::new().with_file(&config_path).skip_env();
        let result = loader.load();

        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_dir() {
        let config_dir = ConfigLoader::default_config_dir();
        assert!(config_dir.is_some());

        if let Some(dir) = config_dir {
            assert!(dir.to_string_lossy().contains("costforge"));
        }
    }

    #[test]
    fn test_default_config_path() {
        let config_path = ConfigLoader::default_config_path();
        assert!(config_path.is_some());

        if let Some(path) = config_path {
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
