use plotters::prelude::*;

use crate::error::ReportError;
use crate::metrics::{FinalResults, HistoryPoint};

const CHART_SIZE: (u32, u32) = (900, 360);

/// Inline SVG charts embedded in the HTML report.
pub(super) struct ChartSet {
    pub(super) rps: String,
    pub(super) response_time: String,
    pub(super) users: String,
    pub(super) status: Option<String>,
}

pub(super) fn render_all(results: &FinalResults) -> Result<ChartSet, ReportError> {
    let history = &results.history;
    let status = if results.status_codes.is_empty() {
        None
    } else {
        let bars: Vec<(String, u64)> = results
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();
        Some(bar_chart("Status Code Distribution", "Status Code", "Requests", &bars)?)
    };
    Ok(ChartSet {
        rps: line_chart(
            "Requests per Second",
            "Requests per Second",
            &series(history, |point| point.requests_per_second),
            &BLUE,
        )?,
        response_time: line_chart(
            "Average Response Time",
            "Response Time (ms)",
            &series(history, |point| point.avg_response_time_ms),
            &RED,
        )?,
        users: line_chart(
            "Active Users",
            "Users",
            &series(history, |point| point.active_users as f64),
            &GREEN,
        )?,
        status,
    })
}

fn series(history: &[HistoryPoint], value: fn(&HistoryPoint) -> f64) -> Vec<(f64, f64)> {
    history
        .iter()
        .map(|point| (point.elapsed_secs, value(point)))
        .collect()
}

pub(super) fn line_chart(
    title: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    color: &RGBColor,
) -> Result<String, ReportError> {
    let x_max = points
        .iter()
        .map(|(elapsed, _)| *elapsed)
        .fold(1.0_f64, f64::max);
    let y_max = points
        .iter()
        .map(|(_, value)| *value)
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0_f64..x_max, 0.0_f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Elapsed Time (seconds)")
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(LineSeries::new(points.iter().copied(), color))?;
        root.present()?;
    }
    Ok(svg)
}

pub(super) fn bar_chart(
    title: &str,
    x_desc: &str,
    y_desc: &str,
    bars: &[(String, u64)],
) -> Result<String, ReportError> {
    let slots = u32::try_from(bars.len()).unwrap_or(u32::MAX).max(1);
    let y_max = bars
        .iter()
        .map(|(_, count)| *count)
        .max()
        .unwrap_or(0)
        .saturating_add(1);
    let label_of = |slot: &u32| -> String {
        usize::try_from(*slot)
            .ok()
            .and_then(|index| bars.get(index))
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..slots).into_segmented(), 0u64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|value| match value {
                SegmentValue::Exact(slot) | SegmentValue::CenterOf(slot) => label_of(slot),
                SegmentValue::Last => String::new(),
            })
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.filled())
                .margin(20)
                .data(
                    bars.iter()
                        .enumerate()
                        .map(|(index, (_, count))| (u32::try_from(index).unwrap_or(u32::MAX), *count)),
                ),
        )?;
        root.present()?;
    }
    Ok(svg)
}
