// ============================================================================
// convoy-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Terminal rendering of batch progress
//
// Implements the core ProgressReporter trait with an indicatif bar for the
// running ffmpeg phase and terminal status lines for file milestones. The
// bar is hidden when stderr is not a terminal.

use std::path::Path;
use std::sync::Mutex;

use convoy_core::execution::ExecutionState;
use convoy_core::progress::ProgressReporter;
use convoy_core::reporting::summary_lines;
use convoy_core::{BatchSummary, ExecutionResult, ExecutionStatus, format_bytes, format_duration};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::terminal;

const BAR_TEMPLATE: &str = "  {prefix:<18} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Human-friendly reporter that prints concise text output.
pub struct TerminalProgress {
    progress: Mutex<Option<ProgressBar>>,
    max_percent: Mutex<f32>,
    show_bars: bool,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
            max_percent: Mutex::new(0.0),
            show_bars: console::Term::stderr().is_term(),
        }
    }

    fn start_bar(&self, label: &str) {
        self.finish_bar();
        let bar = if self.show_bars {
            ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(bar);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
        if let Ok(mut max) = self.max_percent.lock() {
            *max = 0.0;
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn batch_started(&self, total_files: usize) {
        terminal::print_section("conversion");
        terminal::print_status("Files", &total_files.to_string(), true);
    }

    fn file_started(&self, index: usize, total: usize, source: &Path) {
        let name = source
            .file_name()
            .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());
        terminal::print_processing(&format!("[{}/{}] {}", index + 1, total, name));
    }

    fn state_changed(&self, _source: &Path, state: ExecutionState) {
        match state {
            ExecutionState::Pass1Analysis | ExecutionState::Pass2Encode | ExecutionState::SinglePassEncode => {
                self.start_bar(&state.to_string());
            }
            ExecutionState::Finalizing => self.finish_bar(),
            state if state.is_terminal() => self.finish_bar(),
            _ => {}
        }
    }

    fn encode_progress(&self, percent: f32, elapsed_secs: f64, total_secs: f64, speed: f32) {
        let Ok(guard) = self.progress.lock() else {
            return;
        };
        let Some(bar) = guard.as_ref() else {
            return;
        };
        let Ok(mut max_percent) = self.max_percent.lock() else {
            return;
        };

        // ffmpeg can report time going backwards; keep the bar monotonic.
        let clamped = percent.clamp(0.0, 100.0);
        if clamped >= *max_percent {
            *max_percent = clamped;
            bar.set_position(clamped as u64);
        }
        bar.set_message(format!(
            "{} / {}, speed {:.1}x",
            format_duration(elapsed_secs),
            format_duration(total_secs),
            speed
        ));
    }

    fn file_finished(&self, result: &ExecutionResult) {
        self.finish_bar();
        match (&result.status, &result.failure) {
            (ExecutionStatus::Completed, _) => {
                let size = result.output_size.map_or_else(|| "unknown size".to_string(), format_bytes);
                terminal::print_success(&format!(
                    "Done in {} ({})",
                    format_duration(result.elapsed.as_secs_f64()),
                    size
                ));
                if let Some(score) = result.preview_score {
                    terminal::print_sub_item(&format!("Preview score: {score:.2}"));
                }
            }
            (ExecutionStatus::Skipped, reason) => {
                let reason = reason.as_ref().map(ToString::to_string).unwrap_or_default();
                terminal::print_skipped(&reason);
            }
            (ExecutionStatus::Failed, reason) => {
                let reason = reason.as_ref().map(ToString::to_string).unwrap_or_default();
                terminal::print_error("File failed", &reason, Some("See the run log for ffmpeg output"));
            }
        }
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.finish_bar();
        terminal::print_section("summary");
        for line in summary_lines(summary) {
            println!("  {line}");
        }
    }
}
