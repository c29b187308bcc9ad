//! ServiceConfig - Config Loader output
//!
//! Describes the default data source, the broadcast engine, the optional
//! upload collector and any auxiliary sinks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Source type of the always-present loopback source
pub const APPLICATION_SOURCE_TYPE: &str = "application";

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Default data source
    #[serde(default)]
    pub source: SourceConfig,

    /// Broadcast engine settings
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Remote collector (disabled when absent)
    #[serde(default)]
    pub upload: Option<UploadConfig>,

    /// Auxiliary sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Default data source selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Registered source type identifier (e.g. "trace")
    #[serde(default = "default_source_type")]
    pub source_type: String,

    /// Resource locator handed to the source (parsed as a URL)
    #[serde(default)]
    pub resource: Option<String>,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            resource: None,
            params: HashMap::new(),
        }
    }
}

fn default_source_type() -> String {
    APPLICATION_SOURCE_TYPE.to_string()
}

/// Broadcast engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Signal queue capacity
    #[serde(default = "default_broadcast_capacity")]
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    1000
}

/// Remote collector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Endpoint receiving the POSTed batches
    pub url: String,

    /// Records per request; reaching it wakes the uploader
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum records buffered before new ones are dropped
    #[serde(default = "default_upload_capacity")]
    pub capacity: usize,

    /// Connect/read timeout per request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fixed delay after a transport failure
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl UploadConfig {
    /// Settings with defaults for everything but the endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            batch_size: default_batch_size(),
            capacity: default_upload_capacity(),
            timeout_ms: default_timeout_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn default_batch_size() -> usize {
    25
}

fn default_upload_capacity() -> usize {
    5000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_backoff_ms() -> u64 {
    5000
}

/// Auxiliary sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Auxiliary sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log record summaries
    Log,
    /// Record a replayable trace file
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.source.source_type, APPLICATION_SOURCE_TYPE);
        assert_eq!(config.broadcast.queue_capacity, 1000);
        assert!(config.upload.is_none());
        assert!(config.sinks.is_empty());
    }

    #[test]
    fn test_upload_defaults() {
        let upload: UploadConfig =
            serde_json::from_str(r#"{ "url": "http://localhost:8080/records" }"#).unwrap();
        assert_eq!(upload.batch_size, 25);
        assert_eq!(upload.capacity, 5000);
        assert_eq!(upload.timeout(), Duration::from_secs(5));
        assert_eq!(upload.backoff(), Duration::from_secs(5));
    }
}
