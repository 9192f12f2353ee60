use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use csv::{Writer, WriterBuilder};

use crate::config::LoadTestSettings;
use crate::error::ReportError;
use crate::metrics::{FinalResults, ProgressSnapshot};

use super::{Reporter, write_output};

/// Writes `<base>_summary.csv`, `<base>_detailed.csv` and `<base>_metrics.csv`.
pub struct CsvReporter {
    url: String,
    protocol: &'static str,
    mode: &'static str,
    num_users: usize,
    summary_path: PathBuf,
    detailed_path: PathBuf,
    metrics_path: PathBuf,
    snapshots: Vec<ProgressSnapshot>,
}

impl CsvReporter {
    #[must_use]
    pub fn new(settings: &LoadTestSettings) -> Self {
        Self {
            url: settings.url.clone(),
            protocol: settings.protocol.as_str(),
            mode: settings.mode.as_str(),
            num_users: settings.num_users,
            summary_path: settings.output_path("_summary.csv"),
            detailed_path: settings.output_path("_detailed.csv"),
            metrics_path: settings.output_path("_metrics.csv"),
            snapshots: Vec::new(),
        }
    }

    pub(super) fn summary_csv(&self, results: &FinalResults) -> Result<Vec<u8>, ReportError> {
        let times = &results.response_times;
        let mut writer = buffer_writer();
        writer.write_record(["Metric", "Value"])?;
        let rows = [
            ("URL", self.url.clone()),
            ("Protocol", self.protocol.to_uppercase()),
            ("Mode", self.mode.to_uppercase()),
            ("Users", self.num_users.to_string()),
            ("Duration (s)", format!("{:.2}", results.duration.as_secs_f64())),
            ("Total Requests", results.total_requests.to_string()),
            ("Successful Requests", results.successful_requests.to_string()),
            ("Failed Requests", results.failed_requests.to_string()),
            ("Average RPS", format!("{:.2}", results.requests_per_second)),
            ("Peak RPS", format!("{:.2}", results.max_rps)),
            ("Minimum Response Time (ms)", format!("{:.2}", times.min)),
            ("Average Response Time (ms)", format!("{:.2}", times.avg)),
            ("Maximum Response Time (ms)", format!("{:.2}", times.max)),
            ("Median Response Time (ms)", format!("{:.2}", times.median)),
            ("90th Percentile (ms)", format!("{:.2}", times.p90)),
            ("95th Percentile (ms)", format!("{:.2}", times.p95)),
            ("99th Percentile (ms)", format!("{:.2}", times.p99)),
            ("Response Time Std Dev (ms)", format!("{:.2}", times.std_dev)),
        ];
        for (metric, value) in &rows {
            writer.write_record([*metric, value.as_str()])?;
        }

        if !results.status_codes.is_empty() {
            writer.write_record(["", ""])?;
            writer.write_record(["Status Codes", "Count"])?;
            for (code, count) in &results.status_codes {
                writer.write_record([code.to_string(), count.to_string()])?;
            }
        }
        if !results.errors.is_empty() {
            writer.write_record(["", ""])?;
            writer.write_record(["Error Types", "Count"])?;
            for (name, count) in results.errors_by_count() {
                writer.write_record([name.to_owned(), count.to_string()])?;
            }
        }
        finish(writer)
    }
}

#[async_trait]
impl Reporter for CsvReporter {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn report_start(&mut self, _settings: &LoadTestSettings) -> Result<(), ReportError> {
        self.snapshots.clear();
        Ok(())
    }

    async fn report_progress(&mut self, snapshot: &ProgressSnapshot) -> Result<(), ReportError> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError> {
        write_output(&self.summary_path, self.summary_csv(results)?).await?;
        write_output(&self.detailed_path, detailed_csv(results)?).await?;
        write_output(&self.metrics_path, metrics_csv(&self.snapshots)?).await?;
        println!(
            "CSV Reporter: Results saved to {}, {} and {}",
            self.summary_path.display(),
            self.detailed_path.display(),
            self.metrics_path.display()
        );
        Ok(())
    }
}

/// One row per aggregation tick with a column per status code and error kind
/// seen anywhere in the run.
pub(super) fn detailed_csv(results: &FinalResults) -> Result<Vec<u8>, ReportError> {
    let codes: BTreeSet<u16> = results
        .history
        .iter()
        .flat_map(|point| point.status_codes.keys().copied())
        .collect();
    let errors: BTreeSet<&str> = results
        .history
        .iter()
        .flat_map(|point| point.errors.keys().map(String::as_str))
        .collect();
    let last_elapsed = results
        .history
        .last()
        .map_or(0.0, |point| point.elapsed_secs);

    let mut writer = buffer_writer();
    let mut header: Vec<String> = [
        "timestamp",
        "active_users",
        "completed_requests",
        "rps",
        "avg_response_time",
        "progress",
    ]
    .iter()
    .map(|column| (*column).to_owned())
    .collect();
    header.extend(codes.iter().map(|code| format!("status_{}", code)));
    header.extend(errors.iter().map(|name| format!("error_{}", name)));
    writer.write_record(&header)?;

    for point in &results.history {
        let progress = if last_elapsed > 0.0 {
            (point.elapsed_secs / last_elapsed * 100.0).min(100.0)
        } else {
            100.0
        };
        let mut row = vec![
            point.timestamp.to_rfc3339(),
            point.active_users.to_string(),
            point.total_requests.to_string(),
            format!("{:.2}", point.requests_per_second),
            format!("{:.2}", point.avg_response_time_ms),
            format!("{:.1}", progress),
        ];
        row.extend(
            codes
                .iter()
                .map(|code| point.status_codes.get(code).copied().unwrap_or(0).to_string()),
        );
        row.extend(
            errors
                .iter()
                .map(|name| point.errors.get(*name).copied().unwrap_or(0).to_string()),
        );
        writer.write_record(&row)?;
    }
    finish(writer)
}

/// Progress snapshots as received during the run.
pub(super) fn metrics_csv(snapshots: &[ProgressSnapshot]) -> Result<Vec<u8>, ReportError> {
    let mut writer = buffer_writer();
    writer.write_record([
        "timestamp",
        "active_users",
        "completed_requests",
        "current_rps",
        "avg_response_time",
        "progress_pct",
    ])?;
    for snapshot in snapshots {
        writer.write_record([
            snapshot.timestamp.to_rfc3339(),
            snapshot.active_users.to_string(),
            snapshot.completed_requests.to_string(),
            format!("{:.2}", snapshot.current_rps),
            format!("{:.2}", snapshot.avg_response_time_ms),
            format!("{:.1}", snapshot.percent_complete),
        ])?;
    }
    finish(writer)
}

fn buffer_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new().flexible(true).from_writer(Vec::new())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>, ReportError> {
    writer
        .into_inner()
        .map_err(|err| ReportError::CsvFlush {
            source: err.into_error(),
        })
}
