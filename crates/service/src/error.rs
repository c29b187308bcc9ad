//! Service error types

use thiserror::Error;

/// Errors surfaced by the vehicle service facade
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Source(#[from] sources::SourceError),

    #[error(transparent)]
    Sink(#[from] sinks::SinkError),

    #[error(transparent)]
    Pipeline(#[from] pipeline::PipelineError),

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

/// Service Result alias
pub type Result<T> = std::result::Result<T, ServiceError>;
