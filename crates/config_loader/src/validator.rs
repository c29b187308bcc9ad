//! Configuration validation
//!
//! Rules:
//! - source type is non-empty
//! - upload URL parses and uses http(s)
//! - upload batch_size > 0, capacity >= batch_size, timeout_ms > 0
//! - broadcast queue_capacity > 0
//! - sink names are non-empty and unique, file sinks have a `path`

use std::collections::HashSet;

use contracts::{ContractError, ServiceConfig, SinkType, UploadConfig};

/// Validate a ServiceConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_source(config)?;
    validate_broadcast(config)?;
    if let Some(upload) = &config.upload {
        validate_upload(upload)?;
    }
    validate_sinks(config)?;
    Ok(())
}

fn validate_source(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.source.source_type.trim().is_empty() {
        return Err(ContractError::config_validation(
            "source.source_type",
            "source type cannot be empty",
        ));
    }
    Ok(())
}

fn validate_broadcast(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.broadcast.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "broadcast.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_upload(upload: &UploadConfig) -> Result<(), ContractError> {
    let url = url::Url::parse(&upload.url).map_err(|e| {
        ContractError::config_validation("upload.url", format!("invalid URL '{}': {e}", upload.url))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ContractError::config_validation(
            "upload.url",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }

    if upload.batch_size == 0 {
        return Err(ContractError::config_validation(
            "upload.batch_size",
            "batch_size must be > 0",
        ));
    }

    if upload.capacity < upload.batch_size {
        return Err(ContractError::config_validation(
            "upload.capacity",
            format!(
                "capacity ({}) must be >= batch_size ({})",
                upload.capacity, upload.batch_size
            ),
        ));
    }

    if upload.timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "upload.timeout_ms",
            "timeout_ms must be > 0",
        ));
    }

    Ok(())
}

fn validate_sinks(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}
