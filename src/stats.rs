//! Pipeline counters and throughput measurement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Cumulative pipeline counters. All increments are relaxed; the counters
/// are diagnostics, not synchronization.
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    gate_drops: AtomicU64,
    source_failures: AtomicU64,
    preprocess_failures: AtomicU64,
    classify_failures: AtomicU64,
    completed: AtomicU64,
    stale_discarded: AtomicU64,
    stable_events: AtomicU64,
}

impl PipelineStats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_gate_drop(&self) {
        self.gate_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_source_failure(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_preprocess_failure(&self) {
        self.preprocess_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_classify_failure(&self) {
        self.classify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_discard(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stable_event(&self) {
        self.stable_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            gate_drops: self.gate_drops.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            preprocess_failures: self.preprocess_failures.load(Ordering::Relaxed),
            classify_failures: self.classify_failures.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            stable_events: self.stable_events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames offered to the pipeline.
    pub submitted: u64,
    /// Frames dropped because the gate was saturated (push mode).
    pub gate_drops: u64,
    /// Poll-mode source errors.
    pub source_failures: u64,
    /// Frames rejected by the crop/resample step.
    pub preprocess_failures: u64,
    /// Classifier calls that failed. The gate slot is released anyway.
    pub classify_failures: u64,
    /// Classifications that completed.
    pub completed: u64,
    /// Completed results discarded because the run had stopped.
    pub stale_discarded: u64,
    /// Stable-condition announcements emitted.
    pub stable_events: u64,
}

/// Delivered-FPS meter: classifications completed per second, measured
/// over a rolling window of at least one second.
#[derive(Debug)]
pub struct FpsMeter {
    frames_done: u32,
    window_start: Instant,
    current: f64,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            frames_done: 0,
            window_start: Instant::now(),
            current: 0.0,
        }
    }

    /// Count one completed classification and return the delivered rate.
    pub fn tick(&mut self) -> f64 {
        self.frames_done += 1;
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.current = self.frames_done as f64 / elapsed;
        }
        if elapsed > 1.0 {
            self.frames_done = 0;
            self.window_start = Instant::now();
        }
        self.current
    }

    /// Most recently measured rate.
    pub fn current(&self) -> f64 {
        self.current
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn counters_accumulate() {
        let stats = PipelineStats::default();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_gate_drop();
        stats.record_completed();

        let snap = stats.snapshot();
        assert_eq!(snap.submitted, 2);
        assert_eq!(snap.gate_drops, 1);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.classify_failures, 0);
    }

    #[test]
    fn fps_meter_measures_roughly_the_tick_rate() {
        let mut meter = FpsMeter::new();
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(20));
            meter.tick();
        }
        // 5 ticks over ~100ms; generous bounds for slow CI machines.
        assert!(meter.current() > 2.0);
        assert!(meter.current() < 1000.0);
    }

    #[test]
    fn fps_meter_window_resets_after_a_second() {
        let mut meter = FpsMeter::new();
        meter.tick();
        thread::sleep(Duration::from_millis(1100));
        meter.tick();
        // Window rolled; the next tick starts a fresh count.
        let rate = meter.tick();
        assert!(rate > 0.0);
    }
}
