//! Process-wide verification counters.
//!
//! Incremented at the call site; [`Metrics::flush`] logs the current values
//! as one `info!` event, typically at the end of a sweep.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::VerdictState;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    submissions_verified: AtomicU64,
    submissions_skipped: AtomicU64,
    verdicts_success: AtomicU64,
    verdicts_failure: AtomicU64,
    verdicts_pending: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub submissions_verified: u64,
    pub submissions_skipped: u64,
    pub verdicts_success: u64,
    pub verdicts_failure: u64,
    pub verdicts_pending: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            submissions_verified: AtomicU64::new(0),
            submissions_skipped: AtomicU64::new(0),
            verdicts_success: AtomicU64::new(0),
            verdicts_failure: AtomicU64::new(0),
            verdicts_pending: AtomicU64::new(0),
        }
    }

    /// Count a completed verification under its verdict state.
    pub fn record_verdict(&self, state: VerdictState) {
        self.submissions_verified.fetch_add(1, Ordering::Relaxed);
        let counter = match state {
            VerdictState::Success => &self.verdicts_success,
            VerdictState::Failure => &self.verdicts_failure,
            VerdictState::Pending => &self.verdicts_pending,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verdicts", state = %state, "counter incremented");
    }

    pub fn inc_skipped(&self) {
        self.submissions_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "submissions_skipped", "counter incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_verified: self.submissions_verified.load(Ordering::Relaxed),
            submissions_skipped: self.submissions_skipped.load(Ordering::Relaxed),
            verdicts_success: self.verdicts_success.load(Ordering::Relaxed),
            verdicts_failure: self.verdicts_failure.load(Ordering::Relaxed),
            verdicts_pending: self.verdicts_pending.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            submissions_verified = s.submissions_verified,
            submissions_skipped = s.submissions_skipped,
            verdicts_success = s.verdicts_success,
            verdicts_failure = s.verdicts_failure,
            verdicts_pending = s.verdicts_pending,
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.submissions_verified,
            &self.submissions_skipped,
            &self.verdicts_success,
            &self.verdicts_failure,
            &self.verdicts_pending,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
