//! Result reporters. Each one receives the start settings, one progress
//! snapshot per second, and the final results.
mod charts;
mod console;
mod csv_report;
mod html;
mod json;


use std::path::Path;

use async_trait::async_trait;

use crate::args::OutputFormat;
use crate::config::LoadTestSettings;
use crate::error::ReportError;
use crate::metrics::{FinalResults, ProgressSnapshot};

pub use console::ConsoleReporter;
pub use csv_report::CsvReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;

#[async_trait]
pub trait Reporter: Send {
    fn name(&self) -> &'static str;

    /// Called once before any virtual user starts.
    ///
    /// # Errors
    ///
    /// Returns an error when the reporter cannot write its output.
    async fn report_start(&mut self, settings: &LoadTestSettings) -> Result<(), ReportError>;

    /// Called on every progress tick.
    ///
    /// # Errors
    ///
    /// Returns an error when the reporter cannot write its output.
    async fn report_progress(&mut self, snapshot: &ProgressSnapshot) -> Result<(), ReportError>;

    /// Called once with the final results.
    ///
    /// # Errors
    ///
    /// Returns an error when the report cannot be rendered or written.
    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError>;
}

/// Reporters for the configured output format, in a fixed order.
#[must_use]
pub fn build_reporters(settings: &LoadTestSettings) -> Vec<Box<dyn Reporter>> {
    let format = settings.output_format;
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
    if format.includes(OutputFormat::Console) {
        reporters.push(Box::new(ConsoleReporter::new(settings)));
    }
    if format.includes(OutputFormat::Csv) {
        reporters.push(Box::new(CsvReporter::new(settings)));
    }
    if format.includes(OutputFormat::Json) {
        reporters.push(Box::new(JsonReporter::new(settings)));
    }
    if format.includes(OutputFormat::Html) {
        reporters.push(Box::new(HtmlReporter::new(settings)));
    }
    reporters
}

/// Writes `contents` to `path`, creating the parent directory if needed.
async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ReportError> {
    let write_error = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(write_error)?;
    }
    tokio::fs::write(path, contents).await.map_err(write_error)
}

/// Share of `count` in `total` as a percentage, 0 for an empty run.
fn percent_of(count: u64, total: u64) -> f64 {
    count as f64 / total.max(1) as f64 * 100.0
}
