//! Progress reporting.
//!
//! The core library reports batch and encode progress through the
//! [`ProgressReporter`] trait without knowing how it is rendered. The CLI
//! supplies a terminal implementation; [`LogProgressReporter`] writes the same
//! milestones to the log.
//!
//! [`FfmpegProgressHandler`] consumes ffmpeg events for one invocation: it
//! turns progress lines into percentages for the reporter, forwards log lines
//! to the `log` crate, and keeps the tail of stderr as diagnostics for when the
//! process exits non-zero.

use std::collections::VecDeque;
use std::path::Path;

use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress, LogLevel as FfmpegLogLevel};

use crate::error::CoreResult;
use crate::execution::ExecutionState;
use crate::utils::{format_duration, parse_ffmpeg_time};
use crate::{BatchSummary, ExecutionResult};

/// Number of stderr lines kept for failure diagnostics.
const DIAGNOSTIC_TAIL_LINES: usize = 40;

/// Receives batch and encode milestones. Every method has a no-op default.
pub trait ProgressReporter {
    fn batch_started(&self, _total_files: usize) {}

    fn file_started(&self, _index: usize, _total: usize, _source: &Path) {}

    fn state_changed(&self, _source: &Path, _state: ExecutionState) {}

    fn encode_progress(&self, _percent: f32, _elapsed_secs: f64, _total_secs: f64, _speed: f32) {}

    fn file_finished(&self, _result: &ExecutionResult) {}

    fn batch_finished(&self, _summary: &BatchSummary) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Reporter that writes milestones through the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn batch_started(&self, total_files: usize) {
        log::info!(target: "convoy::progress", "Processing {total_files} file(s)");
    }

    fn file_started(&self, index: usize, total: usize, source: &Path) {
        log::info!(target: "convoy::progress", "[{}/{}] {}", index + 1, total, source.display());
    }

    fn state_changed(&self, source: &Path, state: ExecutionState) {
        log::debug!(target: "convoy::progress", "{}: {}", source.display(), state);
    }

    fn encode_progress(&self, percent: f32, elapsed_secs: f64, total_secs: f64, speed: f32) {
        log::info!(
            target: "convoy::progress",
            "Encoding progress: {:.1}% | {} / {} | {:.2}x",
            percent,
            format_duration(elapsed_secs),
            format_duration(total_secs),
            speed
        );
    }

    fn file_finished(&self, result: &ExecutionResult) {
        log::info!(target: "convoy::progress", "{}: {}", result.source.display(), result.status);
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        log::info!(
            target: "convoy::progress",
            "Batch finished: {} completed, {} skipped, {} failed",
            summary.completed,
            summary.skipped,
            summary.failed
        );
    }
}

/// Handler for the events of a single ffmpeg invocation.
pub struct FfmpegProgressHandler<'a> {
    duration: Option<f64>,
    reporter: &'a dyn ProgressReporter,
    last_reported_percent: f64,
    stderr_tail: VecDeque<String>,
}

impl<'a> FfmpegProgressHandler<'a> {
    #[must_use]
    pub fn new(duration: f64, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            duration: (duration > 0.0).then_some(duration),
            reporter,
            last_reported_percent: -1.0,
            stderr_tail: VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES),
        }
    }

    /// Handles an ffmpeg event.
    pub fn handle_event(&mut self, event: FfmpegEvent) -> CoreResult<()> {
        match event {
            FfmpegEvent::Progress(progress) => self.handle_progress(&progress),
            FfmpegEvent::Log(level, message) => self.handle_log(&level, &message),
            FfmpegEvent::Error(error) => {
                log::debug!(target: "ffmpeg_log", "{error}");
                self.push_diagnostic(format!("ERROR: {error}"));
            }
            _ => {}
        }
        Ok(())
    }

    /// The last lines of stderr, newline separated.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        self.stderr_tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    fn handle_progress(&mut self, progress: &FfmpegProgress) {
        let Some(total) = self.duration else {
            return;
        };
        let current = parse_ffmpeg_time(&progress.time).unwrap_or(0.0);
        let percent = (current / total * 100.0).clamp(0.0, 100.0);

        if percent >= self.last_reported_percent + 1.0 || (percent >= 100.0 && self.last_reported_percent < 100.0) {
            self.reporter.encode_progress(percent as f32, current, total, progress.speed);
            self.last_reported_percent = percent;
        }
    }

    fn handle_log(&mut self, level: &FfmpegLogLevel, message: &str) {
        let log_level = map_ffmpeg_log_level(level);
        if log_level == log::Level::Info {
            log::trace!(target: "ffmpeg_log", "{message}");
        } else {
            log::log!(target: "ffmpeg_log", log_level, "{message}");
        }
        self.push_diagnostic(message.to_string());
    }

    fn push_diagnostic(&mut self, line: String) {
        if self.stderr_tail.len() == DIAGNOSTIC_TAIL_LINES {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line);
    }
}

/// Maps ffmpeg log level to Rust log level
fn map_ffmpeg_log_level(level: &FfmpegLogLevel) -> log::Level {
    match level {
        FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => log::Level::Error,
        FfmpegLogLevel::Warning => log::Level::Warn,
        FfmpegLogLevel::Info => log::Level::Info,
        _ => log::Level::Trace,
    }
}
