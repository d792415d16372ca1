//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::target_reports;
use contracts::ForwarderConfig;

use super::{describe_source, load_config};
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    source: String,
    poll: PollInfo,
    targets: Vec<TargetInfo>,
}

#[derive(Serialize)]
struct PollInfo {
    interval_secs: f64,
    max_age_secs: f64,
}

#[derive(Serialize)]
struct TargetInfo {
    name: &'static str,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    send_interval_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %describe_source(args.config.as_deref()), "Loading configuration info");

    let config = load_config(args.config.as_deref())?;
    let info = build_config_info(describe_source(args.config.as_deref()), &config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(source: String, config: &ForwarderConfig) -> ConfigInfo {
    // (url, color, interval) in the same order as target_reports
    let sections = [
        (
            config.legacy.url.clone(),
            config.legacy.color.clone(),
            config.legacy.send_interval_secs,
        ),
        (
            config.vendor_cloud.url.clone(),
            config.vendor_cloud.color.clone(),
            config.vendor_cloud.send_interval_secs,
        ),
        (
            Some(config.influxdb.url.clone()),
            config.influxdb.color.clone(),
            config.influxdb.send_interval_secs,
        ),
    ];

    let targets = target_reports(config)
        .into_iter()
        .zip(sections)
        .map(|(report, (url, color, send_interval_secs))| TargetInfo {
            name: report.name,
            enabled: report.enabled,
            url,
            color,
            send_interval_secs,
            error: report.error,
        })
        .collect();

    ConfigInfo {
        source,
        poll: PollInfo {
            interval_secs: config.poll.interval_secs,
            max_age_secs: config.poll.max_age_secs,
        },
        targets,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Tilt Forwarder Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Source: {}", info.source);

    println!("\n⏱  Poll");
    println!("   ├─ Interval: {}s", info.poll.interval_secs);
    println!("   └─ Max reading age: {}s", info.poll.max_age_secs);

    println!("\n📤 Targets ({})", info.targets.len());
    for (i, target) in info.targets.iter().enumerate() {
        let is_last = i == info.targets.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let state = match (target.enabled, &target.error) {
            (false, _) => "disabled",
            (true, None) => "ready",
            (true, Some(_)) => "misconfigured",
        };
        println!("   {} {} ({})", prefix, target.name, state);
        println!(
            "   {}  ├─ URL: {}",
            child_prefix,
            target.url.as_deref().unwrap_or("(unset)")
        );
        println!(
            "   {}  ├─ Color: {}",
            child_prefix,
            target.color.as_deref().unwrap_or("(any)")
        );
        match (&target.error, target.enabled) {
            (Some(error), true) => {
                println!("   {}  ├─ Interval: {}s", child_prefix, target.send_interval_secs);
                println!("   {}  └─ Error: {}", child_prefix, error);
            }
            _ => println!("   {}  └─ Interval: {}s", child_prefix, target.send_interval_secs),
        }
    }

    println!();
}
