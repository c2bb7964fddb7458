//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "reel_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "reel_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "reel_runs_failed_total";
    pub const RUN_DURATION_SECONDS: &str = "reel_run_duration_seconds";
    pub const RENDER_TASK_DURATION_SECONDS: &str = "reel_render_task_duration_seconds";
    pub const CANDIDATES_FOUND: &str = "reel_candidates_found";
}

/// Record a run starting.
pub fn record_run_started(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::RUNS_STARTED_TOTAL, &labels).increment(1);
}

/// Record a run completing successfully.
pub fn record_run_completed(mode: &str, duration_secs: f64) {
    let labels = [("mode", mode.to_string())];
    counter!(names::RUNS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a run failing.
pub fn record_run_failed(mode: &str, kind: &str) {
    let labels = [("mode", mode.to_string()), ("kind", kind.to_string())];
    counter!(names::RUNS_FAILED_TOTAL, &labels).increment(1);
}

/// Record one render task.
pub fn record_render_task(mode: &str, duration_secs: f64) {
    let labels = [("mode", mode.to_string())];
    histogram!(names::RENDER_TASK_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how many candidates analysis produced.
pub fn record_candidates(count: usize) {
    histogram!(names::CANDIDATES_FOUND).record(count as f64);
}
