use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One periodic aggregation tick.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub requests_per_second: f64,
    pub active_users: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: f64,
    pub error_count: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub errors: BTreeMap<String, u64>,
}

/// Live progress pushed to reporters once per second.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: f64,
    /// 0 to 100.
    pub percent_complete: f64,
    pub eta_secs: Option<f64>,
    /// Human-readable progress basis, e.g. `Request-based: 40.0% complete (20/50)`.
    pub status: String,
    pub active_users: usize,
    pub completed_requests: u64,
    pub current_rps: f64,
    pub avg_response_time_ms: f64,
    pub error_count: u64,
}

/// Response-time distribution in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseTimeStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone)]
pub struct FinalResults {
    pub duration: Duration,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub requests_per_second: f64,
    pub max_rps: f64,
    pub status_codes: BTreeMap<u16, u64>,
    pub errors: BTreeMap<String, u64>,
    pub response_times: ResponseTimeStats,
    pub history: Vec<HistoryPoint>,
}

impl FinalResults {
    /// Percentage of requests that succeeded, 0 when nothing ran.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        ratio(self.successful_requests, self.total_requests)
    }

    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failed_requests, self.total_requests)
    }

    /// Error kinds sorted by count, most frequent first.
    #[must_use]
    pub fn errors_by_count(&self) -> Vec<(&str, u64)> {
        let mut errors: Vec<(&str, u64)> = self
            .errors
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        errors.sort_by(|left, right| right.1.cmp(&left.1).then(left.0.cmp(right.0)));
        errors
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
