//! Plan execution.
//!
//! Runs a [`ConversionPlan`](crate::planning::ConversionPlan) through ffmpeg:
//! the two-phase or single-phase encode, writing to a temporary output that is
//! renamed into place only after a zero exit status. Also home to the
//! start-of-run recovery that clears what an interrupted run left behind.

pub mod command;
pub mod engine;
pub mod recovery;
pub mod workspace;

use std::fmt;

use serde::Serialize;

pub use engine::ExecutionEngine;
pub use recovery::{RecoveryReport, recover_interrupted_run};
pub use workspace::EncodeWorkspace;

/// Per-file execution state.
///
/// `Planned -> [Pass1Analysis -> Pass2Encode] | [SinglePassEncode] -> Finalizing -> Completed`,
/// with `Failed` reachable from any non-terminal state and `Skipped` decided
/// before execution starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionState {
    Planned,
    Pass1Analysis,
    Pass2Encode,
    SinglePassEncode,
    Finalizing,
    Completed,
    Failed,
    Skipped,
}

impl ExecutionState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planned => "planned",
            Self::Pass1Analysis => "pass 1 (analysis)",
            Self::Pass2Encode => "pass 2 (encode)",
            Self::SinglePassEncode => "encoding",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}
