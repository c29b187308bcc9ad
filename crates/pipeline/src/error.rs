//! Pipeline error types

use thiserror::Error;

/// Pipeline router errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source could not be started when added to the router
    #[error("failed to start source '{name}': {message}")]
    SourceStart { name: String, message: String },

    /// Router has been torn down
    #[error("pipeline router is stopped")]
    Stopped,

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

/// Pipeline Result alias
pub type Result<T> = std::result::Result<T, PipelineError>;
