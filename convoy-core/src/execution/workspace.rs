//! Per-file encode workspaces.
//!
//! Every encode gets its own directory under the run's work root. ffmpeg is
//! started with that directory as its working directory, so encoders that
//! resolve their statistics files relative to the current directory write them
//! there. The orchestrating process never changes its own directory, and no
//! two encodes ever share a workspace.

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;
use tempfile::{Builder as TempFileBuilder, TempDir};

use crate::error::CoreResult;

/// Name prefix of every workspace directory.
pub const WORKSPACE_PREFIX: &str = "encode_";

/// Prefix for ffmpeg's generic two-pass log (`-passlogfile`).
pub const PASS_LOG_PREFIX: &str = "ffmpeg2pass";

/// Statistics file name handed to libx265, relative to the workspace.
pub const X265_STATS_FILE: &str = "x265_2pass.log";

/// Scoped working directory for one file's encode phases.
///
/// Removed with everything in it when dropped.
#[derive(Debug)]
pub struct EncodeWorkspace {
    dir: TempDir,
}

impl EncodeWorkspace {
    /// Creates a fresh workspace under `work_root`.
    pub fn create(work_root: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(work_root)?;
        let root = std::path::absolute(work_root)?;
        let dir = TempFileBuilder::new().prefix(WORKSPACE_PREFIX).tempdir_in(root)?;
        log::debug!("Created encode workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Absolute path of the workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute prefix for `-passlogfile`.
    #[must_use]
    pub fn pass_log_prefix(&self) -> PathBuf {
        self.path().join(PASS_LOG_PREFIX)
    }

    /// Runs `cmd` inside this workspace.
    pub fn bind(&self, cmd: &mut FfmpegCommand) {
        cmd.as_inner_mut().current_dir(self.path());
    }

    /// Deletes everything inside the workspace, keeping the directory.
    ///
    /// Returns the number of entries removed. Failures are logged, not returned.
    pub fn clear_artifacts(&self) -> usize {
        let entries = match std::fs::read_dir(self.path()) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not list workspace {}: {}", self.path().display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove encode artifact {}: {}", path.display(), e),
            }
        }
        log::debug!("Removed {} artifact(s) from {}", removed, self.path().display());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_lifecycle() {
        let root = tempfile::tempdir().unwrap();
        let workspace = EncodeWorkspace::create(&root.path().join("work")).unwrap();
        let dir = workspace.path().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir.is_absolute());
        assert!(workspace.pass_log_prefix().starts_with(&dir));

        std::fs::write(dir.join(X265_STATS_FILE), b"stats").unwrap();
        std::fs::write(dir.join("x265_2pass.log.cutree"), b"tree").unwrap();
        assert_eq!(workspace.clear_artifacts(), 2);
        assert!(dir.is_dir());

        drop(workspace);
        assert!(!dir.exists());
    }

    #[test]
    fn test_workspaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let a = EncodeWorkspace::create(root.path()).unwrap();
        let b = EncodeWorkspace::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_bind_sets_child_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = EncodeWorkspace::create(root.path()).unwrap();
        let mut cmd = FfmpegCommand::new();
        workspace.bind(&mut cmd);
        assert_eq!(cmd.as_inner_mut().get_current_dir(), Some(workspace.path()));
    }
}
