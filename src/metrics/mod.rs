//! Outcome aggregation, rolling and final statistics.
mod aggregator;
pub mod stats;
mod types;


pub use aggregator::{MetricsAggregator, RECENT_WINDOW};
pub use types::{FinalResults, HistoryPoint, ProgressSnapshot, ResponseTimeStats};
