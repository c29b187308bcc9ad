//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source: SourceInfo,
    broadcast_queue_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload: Option<UploadInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct UploadInfo {
    url: String,
    batch_size: usize,
    capacity: usize,
    timeout_ms: u64,
    backoff_ms: u64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &ServiceConfig, args: &InfoArgs) -> ConfigInfo {
    let sinks = if args.sinks {
        config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        source: SourceInfo {
            source_type: config.source.source_type.clone(),
            resource: config.source.resource.clone(),
            params: if args.params {
                config.source.params.clone()
            } else {
                HashMap::new()
            },
        },
        broadcast_queue_capacity: config.broadcast.queue_capacity,
        upload: config.upload.as_ref().map(|u| UploadInfo {
            url: u.url.clone(),
            batch_size: u.batch_size,
            capacity: u.capacity,
            timeout_ms: u.timeout_ms,
            backoff_ms: u.backoff_ms,
        }),
        sinks,
    }
}

fn print_config_info(config: &ServiceConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Telemetry Relay Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Source");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Type: {}", config.source.source_type);
    match &config.source.resource {
        Some(resource) => println!("   └─ Resource: {}", resource),
        None => println!("   └─ Resource: (none)"),
    }

    if args.params && !config.source.params.is_empty() {
        let mut params: Vec<_> = config.source.params.iter().collect();
        params.sort();
        println!("\n   Parameters ({}):", params.len());
        for (i, (name, value)) in params.iter().enumerate() {
            let prefix = if i == params.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} = {}", prefix, name, value);
        }
    }

    println!("\n🔔 Broadcast");
    println!("   └─ Queue capacity: {}", config.broadcast.queue_capacity);

    println!("\n📤 Upload");
    match &config.upload {
        Some(upload) => {
            println!("   ├─ URL: {}", upload.url);
            println!("   ├─ Batch size: {}", upload.batch_size);
            println!("   ├─ Capacity: {}", upload.capacity);
            println!("   └─ Timeout / backoff: {}ms / {}ms", upload.timeout_ms, upload.backoff_ms);
        }
        None => println!("   └─ Disabled"),
    }

    if !config.sinks.is_empty() {
        println!("\n💾 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let prefix = if i == config.sinks.len() - 1 { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {})",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
