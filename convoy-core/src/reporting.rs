//! Run summaries.
//!
//! At the end of a batch the summary is written as JSON next to the run log
//! and rendered as a few plain text lines for the terminal and log file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::CoreResult;
use crate::utils::{calculate_size_reduction, format_bytes, format_duration};
use crate::{BatchSummary, ExecutionStatus};

/// The JSON document written for a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    #[serde(flatten)]
    pub summary: &'a BatchSummary,
}

impl<'a> RunReport<'a> {
    #[must_use]
    pub fn new(
        summary: &'a BatchSummary,
        input_dir: &'a Path,
        output_dir: &'a Path,
        started_at: DateTime<Local>,
    ) -> Self {
        let (total_input_bytes, total_output_bytes) = completed_sizes(summary);
        Self {
            started_at,
            finished_at: Local::now(),
            input_dir,
            output_dir,
            total_input_bytes,
            total_output_bytes,
            summary,
        }
    }
}

/// Input and output bytes summed over completed files.
fn completed_sizes(summary: &BatchSummary) -> (u64, u64) {
    summary
        .results
        .iter()
        .filter(|r| r.status == ExecutionStatus::Completed)
        .fold((0, 0), |(input, output), r| {
            (input + r.input_size, output + r.output_size.unwrap_or(0))
        })
}

/// Writes `report` to `<log_dir>/convoy_summary_<timestamp>.json`.
pub fn write_run_report(log_dir: &Path, report: &RunReport<'_>) -> CoreResult<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!(
        "convoy_summary_{}.json",
        report.started_at.format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    log::debug!("Wrote run summary to {}", path.display());
    Ok(path)
}

/// Plain text lines describing the batch outcome.
#[must_use]
pub fn summary_lines(summary: &BatchSummary) -> Vec<String> {
    let total = summary.completed + summary.skipped + summary.failed;
    let mut lines = vec![format!(
        "{} file(s): {} completed, {} skipped, {} failed in {}",
        total,
        summary.completed,
        summary.skipped,
        summary.failed,
        format_duration(summary.total_elapsed.as_secs_f64())
    )];

    let (input, output) = completed_sizes(summary);
    if summary.completed > 0 && input > 0 {
        lines.push(format!(
            "Size: {} -> {} ({}% reduction)",
            format_bytes(input),
            format_bytes(output),
            calculate_size_reduction(input, output)
        ));
    }

    for result in &summary.results {
        let name = result
            .source
            .file_name()
            .map_or_else(|| result.source.display().to_string(), |n| n.to_string_lossy().into_owned());
        let line = match (&result.status, &result.failure) {
            (ExecutionStatus::Completed, _) => match result.output_size {
                Some(size) => format!(
                    "  {name}: completed, {} ({}% reduction)",
                    format_bytes(size),
                    calculate_size_reduction(result.input_size, size)
                ),
                None => format!("  {name}: completed"),
            },
            (status, Some(reason)) => format!("  {name}: {status}, {reason}"),
            (status, None) => format!("  {name}: {status}"),
        };
        lines.push(line);
    }
    lines
}
