//! Process-wide atomic counters for evaluation activity.
//!
//! Counters are incremented silently by the engine. Call
//! [`EvalCounters::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a CLI run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters singleton.
pub static EVAL_COUNTERS: EvalCounters = EvalCounters::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct EvalCounters {
    items_evaluated: AtomicU64,
    metric_failures: AtomicU64,
    cancellations: AtomicU64,
}

impl Default for EvalCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalCounters {
    pub const fn new() -> Self {
        Self {
            items_evaluated: AtomicU64::new(0),
            metric_failures: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
        }
    }

    pub fn inc_items_evaluated(&self) {
        self.items_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_evaluated", "counter incremented");
    }

    pub fn add_metric_failures(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.metric_failures.fetch_add(count, Ordering::Relaxed);
        tracing::trace!(metric = "metric_failures", count, "counter incremented");
    }

    pub fn inc_cancellations(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cancellations", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            items_evaluated = self.items_evaluated(),
            metric_failures = self.metric_failures(),
            cancellations = self.cancellations(),
        );
    }

    pub fn items_evaluated(&self) -> u64 {
        self.items_evaluated.load(Ordering::Relaxed)
    }

    pub fn metric_failures(&self) -> u64 {
        self.metric_failures.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.items_evaluated.store(0, Ordering::Relaxed);
        self.metric_failures.store(0, Ordering::Relaxed);
        self.cancellations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = EvalCounters::new();
        m.inc_items_evaluated();
        m.inc_items_evaluated();
        assert_eq!(m.items_evaluated(), 2);

        m.add_metric_failures(0);
        m.add_metric_failures(3);
        assert_eq!(m.metric_failures(), 3);

        m.inc_cancellations();
        assert_eq!(m.cancellations(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = EvalCounters::new();
        m.inc_items_evaluated();
        m.add_metric_failures(2);
        m.inc_cancellations();
        m.reset();
        assert_eq!(m.items_evaluated(), 0);
        assert_eq!(m.metric_failures(), 0);
        assert_eq!(m.cancellations(), 0);
    }
}
