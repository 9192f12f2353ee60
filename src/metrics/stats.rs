//! Order statistics over response times expressed in milliseconds.

use super::ResponseTimeStats;

/// Nearest-rank percentile over an ascending slice: index `floor(p * N)`
/// clamped to `[0, N - 1]`. At bucket boundaries this picks the higher value.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let rank = (p * sorted.len() as f64).floor();
    let index = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(last)
    };
    sorted.get(index).copied().unwrap_or(0.0)
}

/// True median: the mean of the two middle values for even lengths.
#[must_use]
pub fn median(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }
    let mid = len / 2;
    let upper = sorted.get(mid).copied().unwrap_or(0.0);
    if len % 2 == 1 {
        return upper;
    }
    let lower = mid
        .checked_sub(1)
        .and_then(|index| sorted.get(index))
        .copied()
        .unwrap_or(upper);
    (lower + upper) / 2.0
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0 with fewer than two samples.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values
        .iter()
        .map(|value| (value - avg).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Sorts `samples` in place and summarizes them.
#[must_use]
pub fn summarize(samples: &mut [f64]) -> ResponseTimeStats {
    if samples.is_empty() {
        return ResponseTimeStats::default();
    }
    samples.sort_by(f64::total_cmp);
    ResponseTimeStats {
        min: samples.first().copied().unwrap_or(0.0),
        max: samples.last().copied().unwrap_or(0.0),
        avg: mean(samples),
        median: median(samples),
        p90: percentile(samples, 0.90),
        p95: percentile(samples, 0.95),
        p99: percentile(samples, 0.99),
        std_dev: std_dev(samples),
    }
}
