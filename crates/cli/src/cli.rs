//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Relay - routes vehicle measurements to listeners and collectors
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-relay",
    author,
    version,
    about = "Vehicle telemetry relay",
    long_about = "Loads a measurement source, keeps the last value of every key, \n\
                  notifies registered listeners and uploads batches of records \n\
                  to a remote collector."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "TELEMETRY_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the default source type (e.g. "trace", "synthetic")
    #[arg(long, env = "TELEMETRY_RELAY_SOURCE_TYPE")]
    pub source_type: Option<String>,

    /// Override the default source resource locator
    #[arg(long, env = "TELEMETRY_RELAY_RESOURCE")]
    pub resource: Option<String>,

    /// Override (or enable) the upload collector URL
    #[arg(long, env = "TELEMETRY_RELAY_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "TELEMETRY_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without starting the relay
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TELEMETRY_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show source parameters
    #[arg(long)]
    pub params: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
