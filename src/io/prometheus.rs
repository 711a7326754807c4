//! Prometheus text exposition for navigation metrics
//!
//! Served at /metrics by the HTTP API. Every series carries a `site` label.

use crate::infra::metrics::{Metrics, MetricsSummary};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a gauge metric with f64 value
fn write_gauge_f64(output: &mut String, name: &str, help: &str, site: &str, val: f64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} gauge");
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val:.6}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_location_metrics(&mut output, site_id, &summary);
    write_progress_metrics(&mut output, site_id, &summary);
    write_directions_metrics(&mut output, site_id, &summary);
    write_api_metrics(&mut output, site_id, &summary);

    output
}

fn write_location_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "campus_nav_samples_total",
        "Location samples accepted",
        MetricType::Counter,
        site,
        summary.samples_total,
    );
    write_gauge_f64(
        output,
        "campus_nav_samples_per_sec",
        "Location samples per second since the last report",
        site,
        summary.samples_per_sec,
    );
    write_metric(
        output,
        "campus_nav_samples_ignored_total",
        "Location samples ignored (invalid or out of order)",
        MetricType::Counter,
        site,
        summary.samples_ignored,
    );
    write_metric(
        output,
        "campus_nav_location_errors_total",
        "Location subscription errors",
        MetricType::Counter,
        site,
        summary.location_errors,
    );
}

fn write_progress_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "campus_nav_steps_advanced_total",
        "Route steps advanced",
        MetricType::Counter,
        site,
        summary.steps_advanced,
    );
    write_metric(
        output,
        "campus_nav_instructions_announced_total",
        "Turn instructions announced",
        MetricType::Counter,
        site,
        summary.instructions_announced,
    );
}

fn write_directions_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "campus_nav_directions_requests_total",
        "Directions requests sent",
        MetricType::Counter,
        site,
        summary.directions_requests,
    );
    write_metric(
        output,
        "campus_nav_directions_failures_total",
        "Directions requests failed (network or invalid response)",
        MetricType::Counter,
        site,
        summary.directions_failures,
    );
    write_metric(
        output,
        "campus_nav_directions_no_route_total",
        "Directions requests that found no route",
        MetricType::Counter,
        site,
        summary.directions_no_route,
    );
    write_metric(
        output,
        "campus_nav_directions_latency_avg_ms",
        "Average directions round trip in milliseconds",
        MetricType::Gauge,
        site,
        summary.directions_latency_avg_ms,
    );
    write_metric(
        output,
        "campus_nav_directions_latency_max_ms",
        "Slowest directions round trip in milliseconds",
        MetricType::Gauge,
        site,
        summary.directions_latency_max_ms,
    );
    write_metric(
        output,
        "campus_nav_stale_routes_discarded_total",
        "Directions responses dropped because the selection changed",
        MetricType::Counter,
        site,
        summary.stale_routes_discarded,
    );
}

fn write_api_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "campus_nav_search_queries_applied_total",
        "Debounced search queries applied",
        MetricType::Counter,
        site,
        summary.search_queries_applied,
    );
    write_metric(
        output,
        "campus_nav_api_requests_total",
        "HTTP API requests served",
        MetricType::Counter,
        site,
        summary.api_requests,
    );
}
