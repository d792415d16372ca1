//! DataTarget trait - Dispatcher output interface
//!
//! Defines the abstract interface for telemetry targets.

use std::fmt;
use std::time::Duration;

use crate::{ForwarderConfig, ReadingSnapshot};

/// Data output trait
///
/// All target implementations must implement this trait. Neither method
/// returns an error: configuration problems are reported through
/// [`TargetStatus`], send problems are logged and summarized in
/// [`DispatchOutcome`].
#[trait_variant::make(DataTarget: Send)]
pub trait LocalDataTarget {
    /// Target name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Apply this target's section of `config`
    ///
    /// Idempotent: applying the same configuration twice leaves the target
    /// in the same state.
    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus;

    /// Current minimum time between two send attempts
    fn send_interval(&self) -> Duration;

    /// Forward the eligible readings of `snapshot`, if the target is due
    async fn process(&mut self, snapshot: &ReadingSnapshot) -> DispatchOutcome;
}

/// Configuration state of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// Enable flag is off
    Disabled,
    /// Enabled with a valid endpoint
    Ready,
    /// Enabled, but the endpoint configuration is invalid; nothing is sent
    Misconfigured(String),
}

impl TargetStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, TargetStatus::Ready)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Disabled => f.write_str("disabled"),
            TargetStatus::Ready => f.write_str("ready"),
            TargetStatus::Misconfigured(reason) => write!(f, "misconfigured: {reason}"),
        }
    }
}

/// Why a target did not reach the network stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Misconfigured,
    /// Send interval has not elapsed since the last attempt
    NotDue,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("disabled"),
            SkipReason::Misconfigured => f.write_str("misconfigured"),
            SkipReason::NotDue => f.write_str("not_due"),
        }
    }
}

/// Result of one `process` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing attempted
    Skipped(SkipReason),
    /// Due, but no fresh reading passed the color filter
    Empty,
    /// Requests were attempted
    Sent { attempted: usize, succeeded: usize },
    /// The target failed in an unexpected way (panic); contained by the dispatcher
    Faulted(String),
}

impl DispatchOutcome {
    /// Number of failed requests
    pub fn failed(&self) -> usize {
        match self {
            DispatchOutcome::Sent {
                attempted,
                succeeded,
            } => attempted.saturating_sub(*succeeded),
            DispatchOutcome::Faulted(_) => 1,
            _ => 0,
        }
    }

    /// Whether the target reached the network stage
    pub fn reached_network(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}
