//! Global atomic counters for Crucible runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    generation_calls: AtomicU64,
    battery_runs: AtomicU64,
    retries: AtomicU64,
    pipelines_finished: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            generation_calls: AtomicU64::new(0),
            battery_runs: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            pipelines_finished: AtomicU64::new(0),
        }
    }

    pub fn inc_generation_calls(&self) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "generation_calls", "counter incremented");
    }

    pub fn inc_battery_runs(&self) {
        self.battery_runs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "battery_runs", "counter incremented");
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries", "counter incremented");
    }

    pub fn inc_pipelines_finished(&self) {
        self.pipelines_finished.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pipelines_finished", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            generation_calls = self.generation_calls(),
            battery_runs = self.battery_runs(),
            retries = self.retries(),
            pipelines_finished = self.pipelines_finished(),
        );
    }

    pub fn generation_calls(&self) -> u64 {
        self.generation_calls.load(Ordering::Relaxed)
    }

    pub fn battery_runs(&self) -> u64 {
        self.battery_runs.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn pipelines_finished(&self) -> u64 {
        self.pipelines_finished.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.generation_calls.store(0, Ordering::Relaxed);
        self.battery_runs.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.pipelines_finished.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_generation_calls();
        m.inc_generation_calls();
        assert_eq!(m.generation_calls(), 2);

        m.inc_battery_runs();
        assert_eq!(m.battery_runs(), 1);

        m.inc_retries();
        m.inc_retries();
        m.inc_retries();
        assert_eq!(m.retries(), 3);

        m.inc_pipelines_finished();
        assert_eq!(m.pipelines_finished(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_generation_calls();
        m.inc_battery_runs();
        m.inc_retries();
        m.inc_pipelines_finished();
        m.reset();
        assert_eq!(m.generation_calls(), 0);
        assert_eq!(m.battery_runs(), 0);
        assert_eq!(m.retries(), 0);
        assert_eq!(m.pipelines_finished(), 0);
    }
}
