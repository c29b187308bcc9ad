//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ServiceConfig, SinkType, APPLICATION_SOURCE_TYPE};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_type: String,
    upload_enabled: bool,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    source_type: config.source.source_type.clone(),
                    upload_enabled: config.upload.is_some(),
                    sink_count: config.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.source.source_type == APPLICATION_SOURCE_TYPE {
        warnings.push(
            "No default source configured - only application data will be routed".to_string(),
        );
    } else if config.source.resource.is_none() && config.source.source_type == "trace" {
        warnings.push("Trace source has no resource - it will fail to load".to_string());
    }

    if config.upload.is_none() {
        warnings.push("No upload collector configured - records are not uploaded".to_string());
    }

    for sink in &config.sinks {
        if sink.sink_type == SinkType::File && sink.queue_capacity < 10 {
            warnings.push(format!(
                "File sink '{}' has a very small queue ({}) - records may be dropped",
                sink.name, sink.queue_capacity
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source_type);
            println!("  Upload: {}", if summary.upload_enabled { "enabled" } else { "disabled" });
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config("[source]\nsource_type = \"trace\"\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("Trace source has no resource")));
        assert!(warnings.iter().any(|w| w.contains("No upload collector")));
        assert_eq!(result.summary.unwrap().source_type, "trace");
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[upload]\nurl = \"http://collector.local\"\nbatch_size = 0\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("batch_size"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/relay.toml".into(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
