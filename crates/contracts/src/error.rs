//! Layered error definitions
//!
//! Categorized by source: config / record / source / interface / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Record Errors =====
    /// Record could not be parsed from its JSON form
    #[error("record parse error: {message}")]
    RecordParse { message: String },

    /// Numeric field is NaN or infinite and has no JSON form
    #[error("record '{key}' has a non-finite {field}")]
    NonFiniteValue { key: String, field: &'static str },

    // ===== Interface Errors =====
    /// Outbound command could not be written to the interface transport
    #[error("interface '{interface}' transport error: {message}")]
    InterfaceTransport { interface: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create interface transport error
    pub fn interface_transport(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InterfaceTransport {
            interface: interface.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
