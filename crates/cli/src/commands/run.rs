//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use contracts::ForwarderConfig;

use super::{describe_source, load_config};
use crate::cli::RunArgs;
use crate::pipeline::{Forwarder, ForwarderOptions};

/// Execute the `run` command
pub async fn run_forwarder(args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    info!(
        source = %describe_source(args.config.as_deref()),
        legacy = config.legacy.enabled,
        vendor_cloud = config.vendor_cloud.enabled,
        influxdb = config.influxdb.enabled,
        poll_interval_secs = config.poll.interval_secs,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let options = ForwarderOptions {
        config_path: args.config.clone(),
        max_ticks: (args.max_ticks != 0).then_some(args.max_ticks),
        reload_on_hangup: true,
    };
    let forwarder = Forwarder::from_config(config, &args.readings, options)
        .context("Failed to set up forwarder")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(
        cancel.clone(),
        (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
    ));

    info!("Starting forwarder...");

    let stats = forwarder
        .run(cancel.clone())
        .await
        .context("Forwarder execution failed")?;
    cancel.cancel();

    info!(
        ticks = stats.ticks,
        requests = stats.requests_attempted(),
        succeeded = stats.requests_succeeded(),
        duration_secs = stats.duration.as_secs_f64(),
        "Forwarder stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Cancel `token` on Ctrl+C, SIGTERM or after `timeout`
async fn cancel_on_shutdown(token: CancellationToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = token.cancelled() => return,
        _ = shutdown_signal() => warn!("Received shutdown signal, stopping forwarder..."),
        _ = deadline => warn!("Run timeout reached, stopping forwarder..."),
    }
    token.cancel();
}

/// Ctrl+C or SIGTERM; a handler that cannot be installed never fires
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
fn print_config_summary(config: &ForwarderConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Poll:");
    println!("  Interval: {}s", config.poll.interval_secs);
    println!("  Max reading age: {}s", config.poll.max_age_secs);

    println!("\nTargets:");
    for report in config_loader::target_reports(config) {
        let state = match (&report.error, report.enabled) {
            (_, false) => "disabled".to_string(),
            (None, true) => "ready".to_string(),
            (Some(error), true) => format!("misconfigured: {error}"),
        };
        println!("  - {} ({})", report.name, state);
    }

    println!();
}
