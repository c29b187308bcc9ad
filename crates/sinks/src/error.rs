//! Sink error types

use thiserror::Error;

/// Sink-specific errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Upload request did not complete (connect/timeout/IO)
    #[error("upload transport failure: {message}")]
    UploadTransportFailure { message: String },

    /// Collector answered with something other than 201
    #[error("unexpected upload response status {status}")]
    UploadUnexpectedStatus { status: u16 },

    /// A listener failed to handle a notification
    #[error("listener failed for key '{key}': {message}")]
    ListenerInvocationFailed { key: String, message: String },

    /// Queue full - record dropped
    #[error("queue full for sink '{sink_name}', record dropped")]
    QueueSaturated { sink_name: String },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an upload transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::UploadTransportFailure {
            message: message.into(),
        }
    }
}
