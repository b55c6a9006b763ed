//! I/O operations for benchmark results.
//!
//! Results are written once, after every model has finished. The CSV file
//! is the primary artefact; the JSON report and the Markdown summary are
//! optional extras.

use crate::markdown;
use crate::result::BenchmarkReport;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default CSV file name.
pub const DEFAULT_CSV_FILE: &str = "benchmark_results.csv";

/// CSV column headers: model, task id, passed, duration (s), speed (tok/s),
/// memory delta (MB).
pub const CSV_HEADER: [&str; 6] = [
    "模型",
    "任务ID",
    "通过",
    "耗时(s)",
    "速度(tok/s)",
    "显存变化(MB)",
];

/// Which files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV detail file only.
    #[default]
    Csv,
    /// CSV plus JSON report.
    Json,
    /// CSV plus Markdown summary.
    Markdown,
    /// Every format.
    All,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "all" | "both" => Ok(OutputFormat::All),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the per-task CSV, one row per (model, task).
pub fn render_csv(report: &BenchmarkReport) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for model in &report.models {
        for outcome in &model.outcomes {
            let generation = &outcome.generation;
            let _ = writeln!(
                out,
                "{},{},{},{:.2},{:.2},{}",
                csv_field(&model.model),
                csv_field(&generation.task_id),
                outcome.passed,
                generation.duration_secs,
                generation.throughput,
                generation.memory_delta.as_raw()
            );
        }
    }

    out
}

/// Write the CSV detail file.
pub fn write_results_csv(report: &BenchmarkReport, path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, render_csv(report))
}

/// Write the full report as pretty JSON.
pub fn write_report_json(report: &BenchmarkReport, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Read a report written by [`write_report_json`].
pub fn read_report_json(path: impl AsRef<Path>) -> io::Result<BenchmarkReport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write the Markdown summary.
pub fn write_summary(report: &BenchmarkReport, path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, markdown::generate_summary(report))
}

/// Write the CSV and any extra formats next to it.
///
/// The JSON and Markdown files share the CSV's stem. Returns the paths
/// written, CSV first.
pub fn write_outputs(
    report: &BenchmarkReport,
    csv_path: impl AsRef<Path>,
    format: OutputFormat,
) -> io::Result<Vec<PathBuf>> {
    let csv_path = csv_path.as_ref();
    if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut written = vec![csv_path.to_path_buf()];
    write_results_csv(report, csv_path)?;

    if matches!(format, OutputFormat::Json | OutputFormat::All) {
        let path = csv_path.with_extension("json");
        write_report_json(report, &path)?;
        written.push(path);
    }

    if matches!(format, OutputFormat::Markdown | OutputFormat::All) {
        let path = csv_path.with_extension("md");
        write_summary(report, &path)?;
        written.push(path);
    }

    Ok(written)
}
