//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, ServiceConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<ServiceConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<ServiceConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<ServiceConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkType;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[source]
source_type = "trace"
resource = "file:///tmp/drive.jsonl"
[source.params]
loop = "true"

[broadcast]
queue_capacity = 64

[upload]
url = "http://collector.local/records"
batch_size = 10

[[sinks]]
name = "recorder"
sink_type = "file"
[sinks.params]
path = "/tmp/out.jsonl"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.source.source_type, "trace");
        assert_eq!(config.source.params.get("loop").map(String::as_str), Some("true"));
        assert_eq!(config.broadcast.queue_capacity, 64);
        let upload = config.upload.unwrap();
        assert_eq!(upload.batch_size, 10);
        assert_eq!(upload.capacity, 5000);
        assert_eq!(config.sinks[0].sink_type, SinkType::File);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "source": { "source_type": "synthetic" },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.source.source_type, "synthetic");
        assert!(config.upload.is_none());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
