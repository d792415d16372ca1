//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::{target_reports, TargetReport};
use contracts::ForwarderConfig;

use super::{describe_source, load_config};
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    poll_interval_secs: f64,
    max_age_secs: f64,
    active_targets: Vec<&'static str>,
    misconfigured_targets: Vec<&'static str>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    let config_source = describe_source(args.config.as_deref());
    info!(config = %config_source, "Validating configuration");

    let result = match load_config(args.config.as_deref()) {
        Ok(config) => validation_result(config_source, &config),
        Err(e) => ValidationResult {
            valid: false,
            config_source,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    };

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

/// A loadable config is valid; broken targets are reported as warnings since
/// the forwarder runs without them
fn validation_result(config_source: String, config: &ForwarderConfig) -> ValidationResult {
    let reports = target_reports(config);
    let warnings = collect_warnings(&reports);

    ValidationResult {
        valid: true,
        config_source,
        error: None,
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(ConfigSummary {
            poll_interval_secs: config.poll.interval_secs,
            max_age_secs: config.poll.max_age_secs,
            active_targets: reports
                .iter()
                .filter(|r| r.is_active())
                .map(|r| r.name)
                .collect(),
            misconfigured_targets: reports
                .iter()
                .filter(|r| r.is_misconfigured())
                .map(|r| r.name)
                .collect(),
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(reports: &[TargetReport]) -> Vec<String> {
    let mut warnings: Vec<String> = reports
        .iter()
        .filter_map(|r| match (&r.error, r.enabled) {
            (Some(error), true) => Some(format!("Target '{}' will be skipped: {}", r.name, error)),
            _ => None,
        })
        .collect();

    if !reports.iter().any(TargetReport::is_active) {
        warnings.push("No target is active - readings will not be forwarded".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_source);

        if let Some(ref summary) = result.summary {
            println!("\n  Poll interval: {}s", summary.poll_interval_secs);
            println!("  Max reading age: {}s", summary.max_age_secs);
            println!("  Active targets: {:?}", summary.active_targets);
            if !summary.misconfigured_targets.is_empty() {
                println!("  Misconfigured targets: {:?}", summary.misconfigured_targets);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_source);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_warns_about_no_targets() {
        let result = validation_result("(environment)".into(), &ForwarderConfig::default());
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No target is active"));
    }

    #[test]
    fn test_misconfigured_target_is_a_warning() {
        let mut config = ForwarderConfig::default();
        config.legacy.enabled = true;
        config.legacy.url = Some("http://fermentrack.local/tiltbridge".into());
        config.influxdb.enabled = true;

        let result = validation_result("forwarder.toml".into(), &config);
        assert!(result.valid);

        let summary = result.summary.unwrap();
        assert_eq!(summary.active_targets, vec!["legacy_http"]);
        assert_eq!(summary.misconfigured_targets, vec!["influxdb"]);

        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Target 'influxdb' will be skipped"));
    }
}
