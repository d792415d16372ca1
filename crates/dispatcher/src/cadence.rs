//! CadenceGate - per-target send interval state

use std::time::Duration;
use tokio::time::Instant;

/// Minimum-interval gate measured from the last send attempt
///
/// The interval is never zero: zero or otherwise invalid updates are
/// rejected and the previous interval is kept.
#[derive(Debug, Clone)]
pub struct CadenceGate {
    interval: Duration,
    last_sent: Instant,
}

impl CadenceGate {
    /// Create a gate whose first window starts now
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: non_zero_or(interval, Duration::from_secs(1)),
            last_sent: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_sent(&self) -> Instant {
        self.last_sent
    }

    /// Whether strictly more than `interval` has elapsed since the last attempt
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_sent) > self.interval
    }

    /// Time left until the gate opens
    pub fn remaining(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_sent))
    }

    /// Record a send attempt
    pub fn mark_sent(&mut self, at: Instant) {
        self.last_sent = at;
    }

    /// Replace the interval; returns false (and keeps the old one) for zero
    pub fn set_interval(&mut self, interval: Duration) -> bool {
        if interval.is_zero() {
            return false;
        }
        self.interval = interval;
        true
    }

    /// Apply a server-provided hint in milliseconds
    ///
    /// Only strictly positive values are accepted.
    pub fn apply_hint_ms(&mut self, hint_ms: i64) -> bool {
        match u64::try_from(hint_ms) {
            Ok(ms) if ms > 0 => self.set_interval(Duration::from_millis(ms)),
            _ => false,
        }
    }
}

fn non_zero_or(interval: Duration, fallback: Duration) -> Duration {
    if interval.is_zero() {
        fallback
    } else {
        interval
    }
}
