//! Lock-free metrics collection and periodic reporting
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use parking_lot::Mutex;
use tracing::info;

/// Lock-free metrics collector
///
/// Totals are monotonic; `samples_since_report` is swapped to zero on each
/// `report()` to derive a rate.
pub struct Metrics {
    samples_total: AtomicU64,
    samples_since_report: AtomicU64,
    samples_ignored: AtomicU64,
    steps_advanced: AtomicU64,
    instructions_announced: AtomicU64,
    directions_requests: AtomicU64,
    directions_failures: AtomicU64,
    directions_no_route: AtomicU64,
    directions_latency_sum_ms: AtomicU64,
    directions_latency_max_ms: AtomicU64,
    stale_routes_discarded: AtomicU64,
    location_errors: AtomicU64,
    search_queries_applied: AtomicU64,
    api_requests: AtomicU64,
    last_report: Mutex<Instant>,
}

/// Snapshot of all counters at report time
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub samples_total: u64,
    pub samples_per_sec: f64,
    pub samples_ignored: u64,
    pub steps_advanced: u64,
    pub instructions_announced: u64,
    pub directions_requests: u64,
    pub directions_failures: u64,
    pub directions_no_route: u64,
    pub directions_latency_avg_ms: u64,
    pub directions_latency_max_ms: u64,
    pub stale_routes_discarded: u64,
    pub location_errors: u64,
    pub search_queries_applied: u64,
    pub api_requests: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            samples_total = %self.samples_total,
            samples_per_sec = %format!("{:.2}", self.samples_per_sec),
            samples_ignored = %self.samples_ignored,
            steps_advanced = %self.steps_advanced,
            instructions_announced = %self.instructions_announced,
            directions_requests = %self.directions_requests,
            directions_failures = %self.directions_failures,
            directions_no_route = %self.directions_no_route,
            directions_latency_avg_ms = %self.directions_latency_avg_ms,
            directions_latency_max_ms = %self.directions_latency_max_ms,
            stale_routes_discarded = %self.stale_routes_discarded,
            location_errors = %self.location_errors,
            "metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            samples_total: AtomicU64::new(0),
            samples_since_report: AtomicU64::new(0),
            samples_ignored: AtomicU64::new(0),
            steps_advanced: AtomicU64::new(0),
            instructions_announced: AtomicU64::new(0),
            directions_requests: AtomicU64::new(0),
            directions_failures: AtomicU64::new(0),
            directions_no_route: AtomicU64::new(0),
            directions_latency_sum_ms: AtomicU64::new(0),
            directions_latency_max_ms: AtomicU64::new(0),
            stale_routes_discarded: AtomicU64::new(0),
            location_errors: AtomicU64::new(0),
            search_queries_applied: AtomicU64::new(0),
            api_requests: AtomicU64::new(0),
            last_report: Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_sample(&self) {
        self.samples_total.fetch_add(1, Ordering::Relaxed);
        self.samples_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sample_ignored(&self) {
        self.samples_ignored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_step_advanced(&self) {
        self.steps_advanced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_instruction_announced(&self) {
        self.instructions_announced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_directions_request(&self) {
        self.directions_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_directions_failure(&self) {
        self.directions_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_directions_no_route(&self) {
        self.directions_no_route.fetch_add(1, Ordering::Relaxed);
    }

    /// Record round-trip time of a directions request
    pub fn record_directions_latency(&self, latency_ms: u64) {
        self.directions_latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.directions_latency_max_ms.fetch_max(latency_ms, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stale_route_discarded(&self) {
        self.stale_routes_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_error(&self) {
        self.location_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_search_applied(&self) {
        self.search_queries_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_api_request(&self) {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn steps_advanced(&self) -> u64 {
        self.steps_advanced.load(Ordering::Relaxed)
    }

    pub fn stale_routes_discarded(&self) -> u64 {
        self.stale_routes_discarded.load(Ordering::Relaxed)
    }

    pub fn instructions_announced(&self) -> u64 {
        self.instructions_announced.load(Ordering::Relaxed)
    }

    /// Build a summary, resetting the per-interval sample counter
    pub fn report(&self) -> MetricsSummary {
        let elapsed = {
            let mut last = self.last_report.lock();
            let elapsed = last.elapsed().as_secs_f64();
            *last = Instant::now();
            elapsed
        };
        let interval_samples = self.samples_since_report.swap(0, Ordering::Relaxed);
        let samples_per_sec =
            if elapsed > 0.0 { interval_samples as f64 / elapsed } else { 0.0 };

        let requests = self.directions_requests.load(Ordering::Relaxed);
        let latency_sum = self.directions_latency_sum_ms.load(Ordering::Relaxed);

        MetricsSummary {
            samples_total: self.samples_total.load(Ordering::Relaxed),
            samples_per_sec,
            samples_ignored: self.samples_ignored.load(Ordering::Relaxed),
            steps_advanced: self.steps_advanced.load(Ordering::Relaxed),
            instructions_announced: self.instructions_announced.load(Ordering::Relaxed),
            directions_requests: requests,
            directions_failures: self.directions_failures.load(Ordering::Relaxed),
            directions_no_route: self.directions_no_route.load(Ordering::Relaxed),
            directions_latency_avg_ms: if requests > 0 { latency_sum / requests } else { 0 },
            directions_latency_max_ms: self.directions_latency_max_ms.load(Ordering::Relaxed),
            stale_routes_discarded: self.stale_routes_discarded.load(Ordering::Relaxed),
            location_errors: self.location_errors.load(Ordering::Relaxed),
            search_queries_applied: self.search_queries_applied.load(Ordering::Relaxed),
            api_requests: self.api_requests.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let metrics = Metrics::new();
        metrics.record_sample();
        metrics.record_sample();
        metrics.record_sample_ignored();
        metrics.record_step_advanced();
        metrics.record_directions_request();
        metrics.record_directions_request();
        metrics.record_directions_latency(100);
        metrics.record_directions_latency(300);

        let summary = metrics.report();
        assert_eq!(summary.samples_total, 2);
        assert_eq!(summary.samples_ignored, 1);
        assert_eq!(summary.steps_advanced, 1);
        assert_eq!(summary.directions_requests, 2);
        assert_eq!(summary.directions_latency_avg_ms, 200);
        assert_eq!(summary.directions_latency_max_ms, 300);
    }

    #[test]
    fn test_report_resets_interval_counter_only() {
        let metrics = Metrics::new();
        metrics.record_sample();
        let _ = metrics.report();
        let summary = metrics.report();
        assert_eq!(summary.samples_total, 1);
        assert_eq!(summary.samples_per_sec, 0.0);
    }
}
