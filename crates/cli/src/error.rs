//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration file could not be parsed or failed validation
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Configuration became invalid after CLI overrides
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// The relay could not be assembled
    #[error("Failed to start relay: {message}")]
    Startup { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_load(path: impl Into<String>, source: ContractError) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            source,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
