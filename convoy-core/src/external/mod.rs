// ============================================================================
// convoy-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg, ffprobe and the file system
//
// This module encapsulates every interaction with the external collaborators:
// the media prober (ffprobe), the encoding engine (ffmpeg, which also acts as
// the perceptual metric engine through its libvmaf/ssim/psnr filters) and file
// metadata. Each is reached through a trait so the planning and execution code
// can be driven by test doubles.
//
// KEY COMPONENTS:
// - MediaProber / FfprobeCli: field-selector queries over parsed ffprobe output
// - FfmpegSpawner / FfmpegProcess / SidecarSpawner: ffmpeg process control
// - FileMetadataProvider: file size lookups
// - check_dependency: startup availability check for the external tools

use crate::error::{CoreError, CoreResult};

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Traits and implementations for spawning ffmpeg processes
pub mod ffmpeg_executor;

/// Field-selector prober backed by the ffprobe crate
pub mod ffprobe_executor;

/// Test doubles for the prober and the ffmpeg spawner
#[cfg(feature = "test-mocks")]
pub mod mocks;

pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner};
pub use ffprobe_executor::{FfprobeCli, FieldSelector, MediaProber, StreamScope, is_field_unavailable};

/// Checks that an external command is available by running it with `-version`.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Verifies that both ffmpeg and ffprobe can be started.
pub fn check_dependencies() -> CoreResult<()> {
    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;
    Ok(())
}

/// Abstraction over file metadata access.
///
/// # Examples
///
/// ```rust
/// use convoy_core::external::FileMetadataProvider;
/// use convoy_core::CoreResult;
/// use std::path::Path;
///
/// struct FixedSize;
///
/// impl FileMetadataProvider for FixedSize {
///     fn get_size(&self, _path: &Path) -> CoreResult<u64> {
///         Ok(1_000_000)
///     }
/// }
///
/// assert_eq!(FixedSize.get_size(Path::new("/fake")).unwrap(), 1_000_000);
/// ```
pub trait FileMetadataProvider {
    /// Gets the size of the file at the given path in bytes.
    fn get_size(&self, path: &Path) -> CoreResult<u64>;
}

/// [`FileMetadataProvider`] backed by `std::fs::metadata`.
#[derive(Debug, Clone, Default)]
pub struct StdFsMetadataProvider;

impl FileMetadataProvider for StdFsMetadataProvider {
    fn get_size(&self, path: &Path) -> CoreResult<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency() {
        let result = check_dependency("convoy-definitely-not-a-real-binary");
        assert!(matches!(result, Err(CoreError::DependencyNotFound(_))));
    }

    #[test]
    fn test_std_metadata_provider() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, b"12345").unwrap();
        assert_eq!(StdFsMetadataProvider.get_size(&file).unwrap(), 5);
        assert!(StdFsMetadataProvider.get_size(&dir.path().join("missing")).is_err());
    }
}
