// ============================================================================
// convoy-core/src/execution/engine.rs
// ============================================================================
//
// EXECUTION ENGINE: Runs one conversion plan to a terminal state
//
// Software encoders take the two-phase path (statistics pass, then the real
// encode); hardware encoders run once. Either way the output is written to
// the plan's temporary path, and only a zero exit status lets it be renamed
// to the final name. Any failure removes the temporary output and the phase
// artifacts, and the caller moves on to the next file.
//
// KEY COMPONENTS:
// - ExecutionEngine: State machine driver for a single plan
// - run_phase: One ffmpeg invocation inside the file's encode workspace

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;

use super::ExecutionState;
use super::command::{pass1_command, pass2_command, single_pass_command};
use super::workspace::EncodeWorkspace;
use crate::FailureReason;
use crate::external::FfmpegSpawner;
use crate::external::ffmpeg_executor::run_to_completion;
use crate::planning::{ConversionPlan, EncoderStrategy};
use crate::progress::{FfmpegProgressHandler, ProgressReporter};

/// Executes conversion plans one at a time.
pub struct ExecutionEngine<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    work_root: PathBuf,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: FfmpegSpawner> ExecutionEngine<'a, S> {
    pub fn new(spawner: &'a S, work_root: PathBuf, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            spawner,
            work_root,
            reporter,
        }
    }

    /// Runs `plan` to completion.
    ///
    /// On success the final output exists at `plan.output_path`; on failure
    /// neither the final nor the temporary output exists.
    pub fn execute(&self, plan: &ConversionPlan) -> Result<(), FailureReason> {
        let source = plan.source_path.as_path();
        self.transition(source, ExecutionState::Planned);

        if let Err(reason) = self.encode(plan) {
            discard_temp_output(plan);
            self.transition(source, ExecutionState::Failed);
            return Err(reason);
        }

        self.transition(source, ExecutionState::Finalizing);
        if let Err(e) = std::fs::rename(&plan.temp_output_path, &plan.output_path) {
            log::error!(
                "Failed to rename {} to {}: {}",
                plan.temp_output_path.display(),
                plan.output_path.display(),
                e
            );
            discard_temp_output(plan);
            self.transition(source, ExecutionState::Failed);
            return Err(FailureReason::RenameFailed {
                message: format!(
                    "{} -> {}: {}",
                    plan.temp_output_path.display(),
                    plan.output_path.display(),
                    e
                ),
            });
        }

        self.transition(source, ExecutionState::Completed);
        Ok(())
    }

    fn encode(&self, plan: &ConversionPlan) -> Result<(), FailureReason> {
        let workspace = EncodeWorkspace::create(&self.work_root).map_err(|e| FailureReason::EncodeFailed {
            exit_code: None,
            diagnostics: format!("failed to create encode workspace: {e}"),
        })?;

        let result = match plan.strategy() {
            EncoderStrategy::TwoPhaseSoftware => {
                let prefix = workspace.pass_log_prefix();
                self.run_phase(plan, ExecutionState::Pass1Analysis, pass1_command(plan, &prefix), &workspace)
                    .and_then(|()| {
                        self.run_phase(plan, ExecutionState::Pass2Encode, pass2_command(plan, &prefix), &workspace)
                    })
            }
            EncoderStrategy::SinglePhaseHardware => self.run_phase(
                plan,
                ExecutionState::SinglePassEncode,
                single_pass_command(plan),
                &workspace,
            ),
        };

        workspace.clear_artifacts();
        result
    }

    fn run_phase(
        &self,
        plan: &ConversionPlan,
        state: ExecutionState,
        mut cmd: FfmpegCommand,
        workspace: &EncodeWorkspace,
    ) -> Result<(), FailureReason> {
        self.transition(&plan.source_path, state);
        workspace.bind(&mut cmd);

        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        log::debug!(target: "convoy::ffmpeg", "ffmpeg {}", args.join(" "));

        let mut handler = FfmpegProgressHandler::new(plan.duration_seconds, self.reporter);
        match run_to_completion(self.spawner, cmd, |event| handler.handle_event(event)) {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                let diagnostics = handler.diagnostics();
                log::error!(
                    "ffmpeg {} failed for {} with {}:\n{}",
                    state,
                    plan.source_path.display(),
                    status,
                    diagnostics
                );
                Err(FailureReason::EncodeFailed {
                    exit_code: status.code(),
                    diagnostics,
                })
            }
            Err(e) => {
                log::error!("ffmpeg {} could not run for {}: {}", state, plan.source_path.display(), e);
                Err(FailureReason::EncodeFailed {
                    exit_code: None,
                    diagnostics: e.to_string(),
                })
            }
        }
    }

    fn transition(&self, source: &Path, state: ExecutionState) {
        log::debug!("{}: {}", source.display(), state);
        self.reporter.state_changed(source, state);
    }
}

fn discard_temp_output(plan: &ConversionPlan) {
    if plan.temp_output_path.exists() {
        match std::fs::remove_file(&plan.temp_output_path) {
            Ok(()) => log::debug!("Removed temporary output {}", plan.temp_output_path.display()),
            Err(e) => log::warn!(
                "Failed to remove temporary output {}: {}",
                plan.temp_output_path.display(),
                e
            ),
        }
    }
}
