// src/pipeline/metrics.rs
//
// Run counters. Cloned into the dispatch worker, so every counter is a
// shared atomic.

use crate::types::Category;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub frames_with_body: Arc<AtomicU64>,
    pub detection_cycles: Arc<AtomicU64>,
    pub pills_seen: Arc<AtomicU64>,
    pub water_seen: Arc<AtomicU64>,
    pub food_seen: Arc<AtomicU64>,
    pub unknown_seen: Arc<AtomicU64>,
    pub sensing_failures: Arc<AtomicU64>,
    pub events_emitted: Arc<AtomicU64>,
    pub dispatch_successes: Arc<AtomicU64>,
    pub dispatch_failures: Arc<AtomicU64>,
    pub cycle_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            frames_with_body: Arc::new(AtomicU64::new(0)),
            detection_cycles: Arc::new(AtomicU64::new(0)),
            pills_seen: Arc::new(AtomicU64::new(0)),
            water_seen: Arc::new(AtomicU64::new(0)),
            food_seen: Arc::new(AtomicU64::new(0)),
            unknown_seen: Arc::new(AtomicU64::new(0)),
            sensing_failures: Arc::new(AtomicU64::new(0)),
            events_emitted: Arc::new(AtomicU64::new(0)),
            dispatch_successes: Arc::new(AtomicU64::new(0)),
            dispatch_failures: Arc::new(AtomicU64::new(0)),
            cycle_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn record_category(&self, category: Category) {
        let counter = match category {
            Category::Pill => &self.pills_seen,
            Category::Water => &self.water_seen,
            Category::Food => &self.food_seen,
            Category::Unknown => &self.unknown_seen,
        };
        self.inc(counter);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            frames_with_body: self.frames_with_body.load(Ordering::Relaxed),
            detection_cycles: self.detection_cycles.load(Ordering::Relaxed),
            pills_seen: self.pills_seen.load(Ordering::Relaxed),
            water_seen: self.water_seen.load(Ordering::Relaxed),
            food_seen: self.food_seen.load(Ordering::Relaxed),
            unknown_seen: self.unknown_seen.load(Ordering::Relaxed),
            sensing_failures: self.sensing_failures.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            dispatch_successes: self.dispatch_successes.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            last_cycle_us: self.cycle_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_with_body: u64,
    pub detection_cycles: u64,
    pub pills_seen: u64,
    pub water_seen: u64,
    pub food_seen: u64,
    pub unknown_seen: u64,
    pub sensing_failures: u64,
    pub events_emitted: u64,
    pub dispatch_successes: u64,
    pub dispatch_failures: u64,
    pub last_cycle_us: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let worker_side = metrics.clone();
        worker_side.inc(&worker_side.dispatch_failures);
        metrics.record_category(Category::Food);
        metrics.record_category(Category::Food);
        metrics.add(&metrics.events_emitted, 3);

        let summary = metrics.summary();
        assert_eq!(summary.dispatch_failures, 1);
        assert_eq!(summary.food_seen, 2);
        assert_eq!(summary.events_emitted, 3);
    }
}
