//! Source loading error types

use contracts::ContractError;
use thiserror::Error;

/// Source loader specific error
#[derive(Debug, Error)]
pub enum SourceError {
    /// No factory registered under this name
    #[error("unknown source type '{source_type}'")]
    UnknownSourceType { source_type: String },

    /// Registered, but not constructible from (context, callback, locator)
    #[error("source type '{source_type}' cannot be constructed from a resource locator")]
    IncompatibleSourceType { source_type: String },

    /// Resource could not be parsed as a URL (non-fatal, logged only)
    #[error("malformed resource locator '{resource}': {message}")]
    MalformedResourceLocator { resource: String, message: String },

    /// Factory rejected its arguments or failed internally
    #[error("failed to construct source '{source_type}': {message}")]
    SourceConstructionFailed {
        source_type: String,
        message: String,
    },

    /// Source was constructed but its producer could not be started
    #[error("failed to start source '{source_type}': {message}")]
    StartFailed {
        source_type: String,
        message: String,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SourceError {
    /// Create construction error
    pub fn construction(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceConstructionFailed {
            source_type: source_type.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SourceError>;
