//! `run` command implementation.

use std::time::Duration;

use anyhow::Result;
use config_loader::ConfigLoader;
use contracts::{ServiceConfig, UploadConfig};
use service::VehicleService;
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::error::{self, CliError};

/// Interval between periodic status lines
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        source_type = %config.source.source_type,
        resource = ?config.source.resource,
        upload = ?config.upload.as_ref().map(|u| u.url.as_str()),
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let relay = VehicleService::new(config).map_err(|e| CliError::startup(e.to_string()))?;
    for source in relay.source_summaries() {
        info!(source = %source, "Source active");
    }

    let deadline = async {
        if args.timeout == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await;
        }
    };
    tokio::pin!(deadline);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping relay...");
                break;
            }
            _ = &mut deadline => {
                info!(timeout_secs = args.timeout, "Timeout reached, stopping relay...");
                break;
            }
            _ = status.tick() => {
                info!(messages = relay.message_count(), "Relay running");
                for sink in relay.sink_summaries() {
                    debug!(sink = %sink, "Sink status");
                }
            }
        }
    }

    relay.shutdown().await;

    info!(messages = relay.message_count(), "Telemetry relay finished");
    Ok(())
}

/// Load the configuration file (or defaults) and apply CLI overrides
fn load_config(args: &RunArgs) -> error::Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            ConfigLoader::load_from_path(path)
                .map_err(|e| CliError::config_load(path.display().to_string(), e))?
        }
        None => {
            info!("No configuration file given, using defaults");
            ServiceConfig::default()
        }
    };

    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(config)
}

fn apply_overrides(config: &mut ServiceConfig, args: &RunArgs) {
    if let Some(ref source_type) = args.source_type {
        info!(source_type = %source_type, "Overriding source type from CLI");
        config.source.source_type = source_type.clone();
    }
    if let Some(ref resource) = args.resource {
        info!(resource = %resource, "Overriding source resource from CLI");
        config.source.resource = Some(resource.clone());
    }
    if let Some(ref url) = args.upload_url {
        info!(url = %url, "Overriding upload URL from CLI");
        match config.upload.as_mut() {
            Some(upload) => upload.url = url.clone(),
            None => config.upload = Some(UploadConfig::new(url.clone())),
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ServiceConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source:");
    println!("  Type: {}", config.source.source_type);
    if let Some(ref resource) = config.source.resource {
        println!("  Resource: {}", resource);
    }

    println!("\nBroadcast:");
    println!("  Queue capacity: {}", config.broadcast.queue_capacity);

    match config.upload {
        Some(ref upload) => {
            println!("\nUpload:");
            println!("  URL: {}", upload.url);
            println!(
                "  Batch size: {} (capacity {})",
                upload.batch_size, upload.capacity
            );
            println!(
                "  Timeout: {}ms, backoff: {}ms",
                upload.timeout_ms, upload.backoff_ms
            );
        }
        None => println!("\nUpload: disabled"),
    }

    if !config.sinks.is_empty() {
        println!("\nSinks ({}):", config.sinks.len());
        for sink in &config.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            source_type: None,
            resource: None,
            upload_url: None,
            timeout: 0,
            dry_run: true,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = load_config(&args()).unwrap();
        assert_eq!(config.source.source_type, "application");
        assert!(config.upload.is_none());
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[source]
source_type = "synthetic"

[upload]
url = "http://collector.local/records"
batch_size = 10
capacity = 100
"#
        )
        .unwrap();

        let mut run_args = args();
        run_args.config = Some(file.path().to_path_buf());
        run_args.source_type = Some("trace".to_string());
        run_args.resource = Some("file:///tmp/drive.jsonl".to_string());
        run_args.upload_url = Some("https://other.local/ingest".to_string());

        let config = load_config(&run_args).unwrap();
        assert_eq!(config.source.source_type, "trace");
        assert_eq!(config.source.resource.as_deref(), Some("file:///tmp/drive.jsonl"));
        let upload = config.upload.unwrap();
        assert_eq!(upload.url, "https://other.local/ingest");
        assert_eq!(upload.batch_size, 10);
    }

    #[test]
    fn test_upload_url_override_enables_upload() {
        let mut run_args = args();
        run_args.upload_url = Some("http://collector.local/records".to_string());

        let config = load_config(&run_args).unwrap();
        assert_eq!(config.upload.unwrap().batch_size, 25);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut run_args = args();
        run_args.upload_url = Some("ftp://collector.local".to_string());

        assert!(matches!(
            load_config(&run_args),
            Err(CliError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let mut run_args = args();
        run_args.config = Some("/nonexistent/relay.toml".into());

        assert!(matches!(
            load_config(&run_args),
            Err(CliError::ConfigNotFound { .. })
        ));
    }
}
