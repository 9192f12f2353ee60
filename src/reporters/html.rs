use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::LoadTestSettings;
use crate::error::ReportError;
use crate::metrics::{FinalResults, ProgressSnapshot};

use super::charts::{ChartSet, render_all};
use super::{Reporter, percent_of, write_output};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
.cards{display:flex;flex-wrap:wrap;gap:1em}\
.card{border:1px solid #ddd;border-radius:6px;padding:1em;min-width:10em}\
.card .value{font-size:1.6em;font-weight:bold}\
table{border-collapse:collapse;margin:1em 0}\
th,td{border:1px solid #ddd;padding:0.4em 0.8em;text-align:left}\
th{background:#f4f4f4}.chart{margin:1.5em 0}";

/// Self-contained `<base>.html` report with inline SVG charts.
pub struct HtmlReporter {
    path: PathBuf,
    url: String,
    protocol: &'static str,
    mode: &'static str,
    num_users: usize,
}

impl HtmlReporter {
    #[must_use]
    pub fn new(settings: &LoadTestSettings) -> Self {
        Self {
            path: settings.output_path(".html"),
            url: settings.url.clone(),
            protocol: settings.protocol.as_str(),
            mode: settings.mode.as_str(),
            num_users: settings.num_users,
        }
    }

    pub(super) fn render(&self, results: &FinalResults) -> Result<String, ReportError> {
        let charts = render_all(results)?;
        let url = escape_html(&self.url);
        let mut out = String::new();
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html><head><meta charset=\"utf-8\">")?;
        writeln!(out, "<title>Load Test Results - {}</title>", url)?;
        writeln!(out, "<style>{}</style></head><body>", STYLE)?;
        writeln!(out, "<h1>Load Test Results</h1>")?;
        writeln!(
            out,
            "<p>{} | {} | {} | {} users | generated {}</p>",
            url,
            self.protocol.to_uppercase(),
            self.mode.to_uppercase(),
            self.num_users,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;

        writeln!(out, "<div class=\"cards\">")?;
        for (label, value) in [
            ("Total Requests", results.total_requests.to_string()),
            ("Success Rate", format!("{:.1}%", results.success_rate())),
            ("Average RPS", format!("{:.2}", results.requests_per_second)),
            ("Peak RPS", format!("{:.2}", results.max_rps)),
            ("Average Response", format!("{:.2} ms", results.response_times.avg)),
            ("Duration", format!("{:.2} s", results.duration.as_secs_f64())),
        ] {
            writeln!(
                out,
                "<div class=\"card\"><div>{}</div><div class=\"value\">{}</div></div>",
                label, value
            )?;
        }
        writeln!(out, "</div>")?;

        write_response_times(&mut out, results)?;
        write_status_codes(&mut out, results)?;
        write_errors(&mut out, results)?;
        write_charts(&mut out, &charts)?;
        writeln!(out, "</body></html>")?;
        Ok(out)
    }
}

#[async_trait]
impl Reporter for HtmlReporter {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn report_start(&mut self, _settings: &LoadTestSettings) -> Result<(), ReportError> {
        Ok(())
    }

    async fn report_progress(&mut self, _snapshot: &ProgressSnapshot) -> Result<(), ReportError> {
        Ok(())
    }

    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError> {
        let page = self.render(results)?;
        write_output(&self.path, page).await?;
        println!("HTML Reporter: Results saved to {}", self.path.display());
        Ok(())
    }
}

fn write_response_times(out: &mut String, results: &FinalResults) -> Result<(), ReportError> {
    let times = &results.response_times;
    writeln!(out, "<h2>Response Times</h2><table>")?;
    writeln!(out, "<tr><th>Metric</th><th>Value (ms)</th></tr>")?;
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
        writeln!(out, "<tr><td>{}</td><td>{:.2}</td></tr>", label, value)?;
    }
    writeln!(out, "</table>")?;
    Ok(())
}

fn write_status_codes(out: &mut String, results: &FinalResults) -> Result<(), ReportError> {
    writeln!(out, "<h2>Status Codes</h2>")?;
    if results.status_codes.is_empty() {
        writeln!(out, "<p>No status codes recorded</p>")?;
        return Ok(());
    }
    writeln!(out, "<table><tr><th>Code</th><th>Count</th><th>Share</th></tr>")?;
    for (code, count) in &results.status_codes {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            code,
            count,
            percent_of(*count, results.total_requests)
        )?;
    }
    writeln!(out, "</table>")?;
    Ok(())
}

fn write_errors(out: &mut String, results: &FinalResults) -> Result<(), ReportError> {
    writeln!(out, "<h2>Errors</h2>")?;
    let errors = results.errors_by_count();
    if errors.is_empty() {
        writeln!(out, "<p>No errors reported</p>")?;
        return Ok(());
    }
    writeln!(out, "<table><tr><th>Error</th><th>Count</th><th>Share</th></tr>")?;
    for (name, count) in errors {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            escape_html(name),
            count,
            percent_of(count, results.total_requests)
        )?;
    }
    writeln!(out, "</table>")?;
    Ok(())
}

fn write_charts(out: &mut String, charts: &ChartSet) -> Result<(), ReportError> {
    writeln!(out, "<h2>Charts</h2>")?;
    for svg in [&charts.rps, &charts.response_time, &charts.users] {
        writeln!(out, "<div class=\"chart\">{}</div>", svg)?;
    }
    if let Some(status) = &charts.status {
        writeln!(out, "<div class=\"chart\">{}</div>", status)?;
    }
    Ok(())
}

pub(super) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
