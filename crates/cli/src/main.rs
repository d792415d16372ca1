//! # Tilt Forwarder CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - The poll loop driving the dispatch handler
//! - Graceful shutdown and SIGHUP reload

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_forwarder, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Tilt Forwarder starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_forwarder(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let (level, ignore_env_filter) = if cli.quiet {
        ("warn", true)
    } else {
        let level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        (level, false)
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: level.to_string(),
        ignore_env_filter,
    })
}
