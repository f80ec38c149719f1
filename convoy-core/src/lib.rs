//! Core library for batch media conversion using ffmpeg and ffprobe.
//!
//! The crate decides *how* each file should be converted and then carries the
//! decision out: it probes each source into a [`media::MediaDescriptor`],
//! compiles a [`planning::ConversionPlan`] from it (rate ladder, container and
//! audio compatibility, hardware path, collision-safe naming), optionally
//! previews the quality on a short clip, and executes the plan through a
//! crash-safe two-phase or single-phase ffmpeg pipeline.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use convoy_core::config::{ConversionTables, CoreConfigBuilder};
//! use convoy_core::external::{FfprobeCli, SidecarSpawner, StdFsMetadataProvider};
//! use convoy_core::progress::LogProgressReporter;
//! use convoy_core::{find_processable_files, process_batch};
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .input_dir(PathBuf::from("/path/to/input"))
//!     .output_dir(PathBuf::from("/path/to/output"))
//!     .target_container("mp4")
//!     .build();
//! let tables = ConversionTables::default();
//! config.validate(&tables).unwrap();
//!
//! let files = find_processable_files(&config.input_dir, &config.extensions).unwrap();
//! let summary = process_batch(
//!     &SidecarSpawner,
//!     &FfprobeCli::new(),
//!     &StdFsMetadataProvider,
//!     &config,
//!     &tables,
//!     &files,
//!     &LogProgressReporter,
//! )
//! .unwrap();
//! assert!(!summary.has_failures());
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod external;
pub mod media;
pub mod planning;
pub mod preview;
pub mod processing;
pub mod progress;
pub mod reporting;
pub mod utils;

// Re-exports for public API
pub use config::{ConversionTables, CoreConfig};
pub use discovery::find_processable_files;
pub use error::{CoreError, CoreResult};
pub use processing::{plan_batch, process_batch};
pub use utils::{format_bytes, format_duration, parse_ffmpeg_time};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Terminal status of one file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why a file did not complete.
///
/// `PlanRejected` accompanies a `Skipped` status; the others mean `Failed`.
/// None of them are retried within a run; running the batch again retries
/// every file that has no final output yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ProbeFailed { message: String },
    PlanRejected { reason: String },
    EncodeFailed { exit_code: Option<i32>, diagnostics: String },
    RenameFailed { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeFailed { message } => write!(f, "probe failed: {message}"),
            Self::PlanRejected { reason } => write!(f, "skipped: {reason}"),
            Self::EncodeFailed { exit_code: Some(code), .. } => write!(f, "encode failed with exit code {code}"),
            Self::EncodeFailed { exit_code: None, diagnostics } => write!(f, "encode failed: {diagnostics}"),
            Self::RenameFailed { message } => write!(f, "finalization failed: {message}"),
        }
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub status: ExecutionStatus,
    pub failure: Option<FailureReason>,
    pub input_size: u64,
    pub output_size: Option<u64>,
    /// Rate profile the plan resolved to, when a plan was compiled.
    pub profile: Option<String>,
    pub preview_score: Option<f64>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// A result for a file that stopped before any encode produced output.
    #[must_use]
    pub fn not_completed(source: PathBuf, status: ExecutionStatus, failure: FailureReason, elapsed: Duration) -> Self {
        Self {
            source,
            output: None,
            status,
            failure: Some(failure),
            input_size: 0,
            output_size: None,
            profile: None,
            preview_score: None,
            elapsed,
        }
    }
}

/// Counters and per-file results for a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub results: Vec<ExecutionResult>,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(rename = "total_elapsed_secs", serialize_with = "serialize_secs")]
    pub total_elapsed: Duration,
}

impl BatchSummary {
    /// Adds one file's result and bumps the matching counter.
    pub fn record(&mut self, result: ExecutionResult) {
        match result.status {
            ExecutionStatus::Completed => self.completed += 1,
            ExecutionStatus::Skipped => self.skipped += 1,
            ExecutionStatus::Failed => self.failed += 1,
        }
        self.results.push(result);
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

fn serialize_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
