use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use async_trait::async_trait;
use crossterm::style::{Color, Stylize};

use crate::args::TestMode;
use crate::config::LoadTestSettings;
use crate::error::ReportError;
use crate::metrics::{FinalResults, ProgressSnapshot};

use super::{Reporter, percent_of};

const RULE_WIDTH: usize = 80;
const BAR_WIDTH: usize = 30;

/// Start banner, live progress line and final summary on stdout.
pub struct ConsoleReporter {
    url: String,
    protocol: &'static str,
    mode: &'static str,
    num_users: usize,
    use_color: bool,
    progress_shown: bool,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(settings: &LoadTestSettings) -> Self {
        Self {
            url: settings.url.clone(),
            protocol: settings.protocol.as_str(),
            mode: settings.mode.as_str(),
            num_users: settings.num_users,
            use_color: !settings.no_color && std::io::stdout().is_terminal(),
            progress_shown: false,
        }
    }

    fn emit(&self, text: &str, color: Option<Color>) -> Result<(), ReportError> {
        let mut out = std::io::stdout().lock();
        let written = match color {
            Some(color) if self.use_color => write!(out, "{}", text.with(color)),
            Some(_) | None => write!(out, "{}", text),
        };
        written
            .and_then(|()| out.flush())
            .map_err(|err| ReportError::Console { source: err })
    }
}

#[async_trait]
impl Reporter for ConsoleReporter {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn report_start(&mut self, settings: &LoadTestSettings) -> Result<(), ReportError> {
        let banner = start_banner(settings)?;
        self.emit(&banner, Some(Color::Cyan))
    }

    async fn report_progress(&mut self, snapshot: &ProgressSnapshot) -> Result<(), ReportError> {
        self.progress_shown = true;
        let line = format!("\r{}", progress_line(snapshot));
        let color = if snapshot.error_count > 0 {
            Color::Yellow
        } else {
            Color::Green
        };
        self.emit(&line, Some(color))
    }

    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError> {
        if self.progress_shown {
            self.emit("\n", None)?;
        }
        let header = RunHeader {
            url: &self.url,
            protocol: self.protocol,
            mode: self.mode,
            num_users: self.num_users,
        };
        let block = results_block(&header, results)?;
        let color = if results.failed_requests > 0 {
            Color::Yellow
        } else {
            Color::Green
        };
        self.emit(&block, Some(color))
    }
}

/// Run identity printed above the final summary.
pub(super) struct RunHeader<'run> {
    pub(super) url: &'run str,
    pub(super) protocol: &'static str,
    pub(super) mode: &'static str,
    pub(super) num_users: usize,
}

pub(super) fn start_banner(settings: &LoadTestSettings) -> Result<String, ReportError> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "LOAD TEST STARTED: {}", settings.url)?;
    writeln!(
        out,
        "Mode: {}, Users: {}",
        settings.mode.as_str().to_uppercase(),
        settings.num_users
    )?;
    match settings.mode {
        TestMode::Loop => writeln!(
            out,
            "Duration: {} seconds, Ramp-up: {} seconds",
            settings.duration.as_secs(),
            settings.ramp_up.as_secs()
        )?,
        TestMode::Fixed => writeln!(
            out,
            "Requests per user: {}, Ramp-up: {} seconds",
            settings.requests_per_user,
            settings.ramp_up.as_secs()
        )?,
    }
    writeln!(out, "Protocol: {}", settings.protocol.as_str().to_uppercase())?;
    writeln!(out, "Scenario: {}", settings.scenario.as_str().to_uppercase())?;
    writeln!(out, "{}\n", rule)?;
    Ok(out)
}

pub(super) fn progress_line(snapshot: &ProgressSnapshot) -> String {
    format!(
        "{:5.1}s | {:3} users | {:5} reqs | {:6.1} req/s | {:6.1} ms avg | {}",
        snapshot.elapsed_secs,
        snapshot.active_users,
        snapshot.completed_requests,
        snapshot.current_rps,
        snapshot.avg_response_time_ms,
        progress_bar(snapshot.percent_complete)
    )
}

pub(super) fn progress_bar(percent: f64) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled = ((BAR_WIDTH as f64) * ratio).floor() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH.saturating_sub(filled))
    )
}

pub(super) fn results_block(
    header: &RunHeader<'_>,
    results: &FinalResults,
) -> Result<String, ReportError> {
    let rule = "=".repeat(RULE_WIDTH);
    let total = results.total_requests;
    let mut out = String::new();
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "LOAD TEST RESULTS")?;
    writeln!(out, "{}", rule)?;

    writeln!(out, "\nURL: {}", header.url)?;
    writeln!(out, "Protocol: {}", header.protocol.to_uppercase())?;
    writeln!(out, "Mode: {}", header.mode.to_uppercase())?;
    writeln!(out, "Users: {}", header.num_users)?;
    writeln!(out, "Duration: {:.2} seconds", results.duration.as_secs_f64())?;
    writeln!(out, "Requests Completed: {}", total)?;
    if total > 0 {
        writeln!(
            out,
            "Successful Requests: {} ({:.1}%)",
            results.successful_requests,
            results.success_rate()
        )?;
        writeln!(
            out,
            "Failed Requests: {} ({:.1}%)",
            results.failed_requests,
            results.failure_rate()
        )?;
    }

    writeln!(out, "\nPerformance Summary:")?;
    writeln!(
        out,
        "  - Average RPS: {:.2} requests/second",
        results.requests_per_second
    )?;
    writeln!(out, "  - Peak RPS: {:.2} requests/second", results.max_rps)?;

    let times = &results.response_times;
    writeln!(out, "\nResponse Times:")?;
    for (label, value) in [
        ("Minimum", times.min),
        ("Average", times.avg),
        ("Maximum", times.max),
        ("Median (P50)", times.median),
        ("90th Percentile", times.p90),
        ("95th Percentile", times.p95),
        ("99th Percentile", times.p99),
        ("Standard Deviation", times.std_dev),
    ] {
        writeln!(out, "  - {}: {:.2} ms", label, value)?;
    }

    if !results.status_codes.is_empty() {
        writeln!(out, "\nStatus Codes:")?;
        for (code, count) in &results.status_codes {
            writeln!(
                out,
                "  - {}: {} ({:.1}%)",
                code,
                count,
                percent_of(*count, total)
            )?;
        }
    }

    let errors = results.errors_by_count();
    if errors.is_empty() {
        writeln!(out, "\nNo errors reported")?;
    } else {
        writeln!(out, "\nErrors:")?;
        for (name, count) in errors {
            writeln!(
                out,
                "  - {}: {} ({:.1}%)",
                name,
                count,
                percent_of(count, total)
            )?;
        }
    }
    writeln!(out, "\n{}", rule)?;
    Ok(out)
}
