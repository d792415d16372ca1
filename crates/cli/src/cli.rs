//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tilt Forwarder - forwards hydrometer readings to telemetry targets
#[derive(Parser, Debug)]
#[command(
    name = "tilt-forwarder",
    author,
    version,
    about = "Forward hydrometer readings to telemetry targets",
    long_about = "Polls the latest hydrometer readings and forwards them to the enabled\n\
                  targets: a legacy HTTP endpoint, a vendor cloud API and InfluxDB v2.\n\n\
                  Targets are configured from an optional TOML/JSON file and the\n\
                  environment (environment values win)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TILT_FORWARDER_VERBOSE")]
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
        env = "TILT_FORWARDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the forwarder poll loop
    Run(RunArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); environment only if omitted
    #[arg(short, long, env = "TILT_FORWARDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON document with the latest readings, re-read every poll tick
    #[arg(
        short,
        long,
        default_value = "readings.json",
        env = "TILT_FORWARDER_READINGS"
    )]
    pub readings: PathBuf,

    /// Stop after this many poll ticks (0 = unlimited)
    #[arg(long, default_value = "0", env = "TILT_FORWARDER_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TILT_FORWARDER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "TILT_FORWARDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, env = "TILT_FORWARDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, env = "TILT_FORWARDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
