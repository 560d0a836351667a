use colored::Colorize;
use costforge_registry::error::RegistryError;
use thiserror::Error;

/// CLI-specific errors with contextual messages and suggestions
#[derive(Debug, Error)]
pub enum CliError {
    /// A plugin install/update/remove/list operation failed
    #[error("{operation} failed: {source}")]
    PluginOperationFailed {
        operation: String,
        #[source]
        source: RegistryError,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        suggestion: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String, suggestion: String },

    /// Invalid input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String, suggestion: String },
}

impl CliError {
    /// Wrap a registry error with the operation name that triggered it
    pub fn plugin_operation_failed(operation: &str, source: RegistryError) -> Self {
        Self::PluginOperationFailed {
            operation: operation.to_string(),
            source,
        }
    }

    /// Create a configuration error with suggestions
    pub fn configuration_error(message: &str, suggestion: &str) -> Self {
        Self::ConfigurationError {
            message: message.to_string(),
            suggestion: suggestion.to_string(),
            source: None,
        }
    }

    /// Create a file not found error with suggestions
    pub fn file_not_found(path: &str) -> Self {
        let suggestion = format!(
            "Check that the file exists and the path is correct: {}",
            path
        );

        let err = Self::FileNotFound {
            path: path.to_string(),
            suggestion,
        };

        eprintln!("\n{} The file might be:", "Suggestion:".yellow().bold());
        eprintln!("  • In a different directory");
        eprintln!("  • Named differently");
        eprintln!("  • Not yet created");

        err
    }

    /// Create an invalid input error with suggestions
    pub fn invalid_input(message: &str, suggestion: &str) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
            suggestion: suggestion.to_string(),
        }
    }

    /// Print the error with formatting and suggestions
    pub fn print_error(&self) {
        eprintln!("\n{} {}", "Error:".red().bold(), self);

        match self {
            Self::PluginOperationFailed { source, .. } => {
                if let Some(suggestion) = source.suggestion() {
                    eprintln!("\n{} {}", "Suggestion:".yellow().bold(), suggestion);
                }
            }
            Self::ConfigurationError { suggestion, .. }
            | Self::FileNotFound { suggestion, .. }
            | Self::InvalidInput { suggestion, .. } => {
                if !suggestion.is_empty() {
                    eprintln!("\n{} {}", "Suggestion:".yellow().bold(), suggestion);
                }
            }
        }
    }

    /// The process exit code this error should produce
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PluginOperationFailed { source, .. } => match source {
                RegistryError::Locked { .. } => exit_codes::LOCKED,
                RegistryError::InvalidSpecifier { .. } => exit_codes::INVALID_INPUT,
                _ => exit_codes::PLUGIN_ERROR,
            },
            Self::ConfigurationError { .. } => exit_codes::CONFIG_ERROR,
            Self::FileNotFound { .. } | Self::InvalidInput { .. } => exit_codes::INVALID_INPUT,
        }
    }
}

/// Exit codes for different error scenarios
pub mod exit_codes {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error
    pub const CONFIG_ERROR: i32 = 3;

    /// Invalid input
    pub const INVALID_INPUT: i32 = 4;

    /// Install/update/remove/launch failure against the plugin registry
    pub const PLUGIN_ERROR: i32 = 5;

    /// Another process is holding the per-plugin lock
    pub const LOCKED: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_operation_failed_exit_code() {
        let err = CliError::plugin_operation_failed(
            "install",
            RegistryError::NotInCatalog {
                name: "demo".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::PLUGIN_ERROR);
    }

    #[test]
    fn test_locked_maps_to_locked_exit_code() {
        let err = CliError::plugin_operation_failed(
            "install",
            RegistryError::Locked {
                name: "demo".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::LOCKED);
    }

    #[test]
    fn test_configuration_error_exit_code() {
        let err = CliError::configuration_error("bad config", "fix it");
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }
}
