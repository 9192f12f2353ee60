use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::protocol::OutcomeRecord;

use super::stats::summarize;
use super::{FinalResults, HistoryPoint};

/// Capacity of the rolling window behind `avg_response_time`.
pub const RECENT_WINDOW: usize = 100;

struct MetricsState {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    tick_requests: u64,
    last_tick: Instant,
    current_rps: f64,
    max_rps: f64,
    active_users: usize,
    recent: VecDeque<f64>,
    recent_capacity: usize,
    response_times: Vec<f64>,
    min_response_ms: Option<f64>,
    max_response_ms: Option<f64>,
    status_codes: BTreeMap<u16, u64>,
    errors: BTreeMap<String, u64>,
    history: Vec<HistoryPoint>,
}

impl MetricsState {
    fn new(now: Instant, recent_capacity: usize) -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            tick_requests: 0,
            last_tick: now,
            current_rps: 0.0,
            max_rps: 0.0,
            active_users: 0,
            recent: VecDeque::with_capacity(recent_capacity),
            recent_capacity,
            response_times: Vec::new(),
            min_response_ms: None,
            max_response_ms: None,
            status_codes: BTreeMap::new(),
            errors: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    fn recent_average(&self) -> f64 {
        let (front, back) = self.recent.as_slices();
        let count = self.recent.len();
        if count == 0 {
            return 0.0;
        }
        (front.iter().sum::<f64>() + back.iter().sum::<f64>()) / count as f64
    }
}

/// Shared sink for outcome records. Writers and readers go through one lock,
/// never held across an `.await`.
pub struct MetricsAggregator {
    started: Instant,
    state: Mutex<MetricsState>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(RECENT_WINDOW)
    }

    #[must_use]
    pub fn with_window(recent_capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            state: Mutex::new(MetricsState::new(now, recent_capacity.max(1))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, outcome: &OutcomeRecord) {
        let elapsed_ms = outcome.response_time.as_secs_f64() * 1000.0;
        let mut state = self.lock();

        state.total_requests = state.total_requests.saturating_add(1);
        state.tick_requests = state.tick_requests.saturating_add(1);
        match outcome.error.as_ref() {
            None => {
                state.successful_requests = state.successful_requests.saturating_add(1);
                if let Some(status) = outcome.status {
                    let count = state.status_codes.entry(status).or_insert(0);
                    *count = count.saturating_add(1);
                }
            }
            Some(kind) => {
                state.failed_requests = state.failed_requests.saturating_add(1);
                let count = state.errors.entry(kind.to_string()).or_insert(0);
                *count = count.saturating_add(1);
            }
        }

        if state.recent.len() >= state.recent_capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(elapsed_ms);
        state.response_times.push(elapsed_ms);
        state.min_response_ms = Some(
            state
                .min_response_ms
                .map_or(elapsed_ms, |min| min.min(elapsed_ms)),
        );
        state.max_response_ms = Some(
            state
                .max_response_ms
                .map_or(elapsed_ms, |max| max.max(elapsed_ms)),
        );
    }

    /// Closes the current aggregation tick.
    pub fn periodic_update(&self) {
        self.update_at(Instant::now());
    }

    /// Closes the current aggregation tick as of `now`.
    pub fn update_at(&self, now: Instant) {
        let mut state = self.lock();
        let since_tick = now.saturating_duration_since(state.last_tick).as_secs_f64();
        let rps = if since_tick > 0.0 {
            state.tick_requests as f64 / since_tick
        } else {
            0.0
        };
        state.current_rps = rps;
        state.max_rps = state.max_rps.max(rps);

        let point = HistoryPoint {
            timestamp: Utc::now(),
            elapsed_secs: now.saturating_duration_since(self.started).as_secs_f64(),
            requests_per_second: rps,
            active_users: state.active_users,
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            avg_response_time_ms: state.recent_average(),
            error_count: state.failed_requests,
            status_codes: state.status_codes.clone(),
            errors: state.errors.clone(),
        };
        state.history.push(point);
        state.tick_requests = 0;
        state.last_tick = now;
    }

    pub fn increment_active_users(&self) {
        let mut state = self.lock();
        state.active_users = state.active_users.saturating_add(1);
    }

    /// Decrements the live user gauge, never below zero.
    pub fn decrement_active_users(&self) {
        let mut state = self.lock();
        state.active_users = state.active_users.saturating_sub(1);
    }

    #[must_use]
    pub fn current_rps(&self) -> f64 {
        self.lock().current_rps
    }

    #[must_use]
    pub fn completed_requests(&self) -> u64 {
        self.lock().total_requests
    }

    #[must_use]
    pub fn active_users(&self) -> usize {
        self.lock().active_users
    }

    /// Mean of the rolling window in milliseconds, 0 when empty.
    #[must_use]
    pub fn avg_response_time(&self) -> f64 {
        self.lock().recent_average()
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.lock().failed_requests
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[must_use]
    pub fn final_results(&self) -> FinalResults {
        let duration = self.started.elapsed();
        let state = self.lock();
        let mut samples = state.response_times.clone();
        let mut response_times = summarize(&mut samples);
        if let (Some(min), Some(max)) = (state.min_response_ms, state.max_response_ms) {
            response_times.min = min;
            response_times.max = max;
        }
        let secs = duration.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            state.total_requests as f64 / secs
        } else {
            0.0
        };

        FinalResults {
            duration,
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            requests_per_second,
            max_rps: state.max_rps,
            status_codes: state.status_codes.clone(),
            errors: state.errors.clone(),
            response_times,
            history: state.history.clone(),
        }
    }

    /// Response times currently held in the rolling window, oldest first.
    #[must_use]
    pub fn recent_window(&self) -> Vec<f64> {
        self.lock().recent.iter().copied().collect()
    }
}
