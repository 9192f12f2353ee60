use std::time::Duration;

use chrono::Utc;

use crate::args::TestMode;
use crate::config::LoadTestSettings;
use crate::metrics::{MetricsAggregator, ProgressSnapshot};

/// Completion estimate for one progress tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub percent: f64,
    pub eta: Option<Duration>,
    pub status: String,
}

/// Loop mode is time-based; fixed mode counts completed requests and
/// extrapolates the remaining time from the observed completion rate.
#[must_use]
pub fn completion(
    mode: TestMode,
    duration: Duration,
    planned_requests: u64,
    completed: u64,
    elapsed: Duration,
) -> Completion {
    match mode {
        TestMode::Loop => {
            let total = duration.as_secs_f64();
            let percent = if total > 0.0 {
                (elapsed.as_secs_f64() / total * 100.0).min(100.0)
            } else {
                100.0
            };
            Completion {
                percent,
                eta: Some(duration.saturating_sub(elapsed)),
                status: format!("Time-based: {:.1}% complete", percent),
            }
        }
        TestMode::Fixed => {
            let percent = if planned_requests > 0 {
                (completed as f64 / planned_requests as f64 * 100.0).min(100.0)
            } else {
                100.0
            };
            let elapsed_secs = elapsed.as_secs_f64();
            let eta = if completed > 0 && elapsed_secs > 0.0 {
                let rate = completed as f64 / elapsed_secs;
                let remaining = planned_requests.saturating_sub(completed) as f64;
                Duration::try_from_secs_f64(remaining / rate).ok()
            } else {
                None
            };
            Completion {
                percent,
                eta,
                status: format!(
                    "Request-based: {:.1}% complete ({}/{})",
                    percent, completed, planned_requests
                ),
            }
        }
    }
}

/// Reads the aggregator's live gauges into a snapshot for reporters.
#[must_use]
pub fn snapshot(settings: &LoadTestSettings, metrics: &MetricsAggregator) -> ProgressSnapshot {
    let elapsed = metrics.elapsed();
    let completed = metrics.completed_requests();
    let estimate = completion(
        settings.mode,
        settings.duration,
        settings.planned_requests(),
        completed,
        elapsed,
    );
    ProgressSnapshot {
        timestamp: Utc::now(),
        elapsed_secs: elapsed.as_secs_f64(),
        percent_complete: estimate.percent,
        eta_secs: estimate.eta.map(|eta| eta.as_secs_f64()),
        status: estimate.status,
        active_users: metrics.active_users(),
        completed_requests: completed,
        current_rps: metrics.current_rps(),
        avg_response_time_ms: metrics.avg_response_time(),
        error_count: metrics.error_count(),
    }
}
