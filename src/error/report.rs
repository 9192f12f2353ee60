use std::path::PathBuf;

use plotters::prelude::{DrawingAreaErrorKind, DrawingBackend, SVGBackend};
use thiserror::Error;

type SvgChartError = DrawingAreaErrorKind<<SVGBackend<'static> as DrawingBackend>::ErrorType>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode CSV: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },
    #[error("Failed to flush CSV buffer: {source}")]
    CsvFlush {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render chart: {source}")]
    Chart {
        #[from]
        source: SvgChartError,
    },
    #[error("Failed to format report line: {source}")]
    Format {
        #[from]
        source: std::fmt::Error,
    },
    #[error("Failed to write console output: {source}")]
    Console {
        #[source]
        source: std::io::Error,
    },
}
