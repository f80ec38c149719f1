//! Start-of-run recovery.
//!
//! A run that is killed mid-encode leaves a `.tmp` output and two-pass
//! statistics files behind. Nothing cleans them up at termination, so every
//! run starts by deleting them. Only names convoy itself produces are
//! touched: `<stem>.<container>.tmp` outputs for containers in the matrix,
//! pass statistics files, and `encode_*` workspaces.

use std::path::Path;

use super::workspace::WORKSPACE_PREFIX;
use crate::config::CompatibilityMatrix;
use crate::error::CoreResult;

/// What recovery removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub temp_outputs_removed: usize,
    pub stats_files_removed: usize,
    pub workspaces_removed: usize,
}

impl RecoveryReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.temp_outputs_removed + self.stats_files_removed + self.workspaces_removed
    }
}

/// True for files two-pass encoders leave behind.
#[must_use]
pub fn is_pass_statistics_file(name: &str) -> bool {
    name.starts_with("ffmpeg2pass")
        || name.starts_with("x265_2pass.log")
        || name.ends_with(".log.mbtree")
        || name.ends_with(".log.temp")
        || name.ends_with(".log.cutree")
}

/// True for `<stem>.<container>.tmp` where the container is in `matrix`.
#[must_use]
pub fn is_temp_output_name(name: &str, matrix: &CompatibilityMatrix) -> bool {
    let Some(output_name) = name.strip_suffix(".tmp") else {
        return false;
    };
    match output_name.rsplit_once('.') {
        Some((stem, container)) => !stem.is_empty() && matrix.container(container).is_some(),
        None => false,
    }
}

/// Removes leftovers of an interrupted run from `output_dir` and `work_root`.
pub fn recover_interrupted_run(
    output_dir: &Path,
    work_root: &Path,
    matrix: &CompatibilityMatrix,
) -> CoreResult<RecoveryReport> {
    let mut report = RecoveryReport::default();

    if output_dir.is_dir() {
        for entry in std::fs::read_dir(output_dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_temp_output = is_temp_output_name(&name, matrix);
            let is_stats = is_pass_statistics_file(&name);
            if !(is_temp_output || is_stats) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed leftover {}", path.display());
                    if is_temp_output {
                        report.temp_outputs_removed += 1;
                    } else {
                        report.stats_files_removed += 1;
                    }
                }
                Err(e) => log::warn!("Could not remove leftover {}: {}", path.display(), e),
            }
        }
    }

    if work_root.is_dir() {
        for entry in std::fs::read_dir(work_root)?.flatten() {
            let path = entry.path();
            let is_workspace = path.is_dir() && entry.file_name().to_string_lossy().starts_with(WORKSPACE_PREFIX);
            if !is_workspace {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => {
                    log::info!("Removed stale workspace {}", path.display());
                    report.workspaces_removed += 1;
                }
                Err(e) => log::warn!("Could not remove stale workspace {}: {}", path.display(), e),
            }
        }
    }

    if report.total() > 0 {
        log::info!(
            "Recovered from interrupted run: {} temp output(s), {} statistics file(s), {} workspace(s) removed",
            report.temp_outputs_removed,
            report.stats_files_removed,
            report.workspaces_removed
        );
    }
    Ok(report)
}
