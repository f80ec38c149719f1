// convoy-core/tests/common/mod.rs
//
// Shared fixtures for the batch integration tests.

#![allow(dead_code)]

use convoy_core::config::{CoreConfig, CoreConfigBuilder};
use convoy_core::external::mocks::{MockAudioStream, MockMediaProber};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const STEREO_AAC: MockAudioStream = MockAudioStream {
    codec: "aac",
    bit_rate: "192000",
    channels: "2",
    sample_rate: "48000",
};

/// Input and output directories for one test batch.
pub struct BatchDirs {
    pub input: TempDir,
    pub output: TempDir,
}

impl BatchDirs {
    pub fn new() -> Self {
        Self {
            input: tempfile::tempdir().expect("Failed to create input dir"),
            output: tempfile::tempdir().expect("Failed to create output dir"),
        }
    }

    /// Config targeting mp4 with the settle delay removed.
    pub fn config(&self) -> CoreConfigBuilder {
        CoreConfigBuilder::new()
            .input_dir(self.input.path().to_path_buf())
            .output_dir(self.output.path().to_path_buf())
            .target_container("mp4")
            .size_settle_delay(Duration::ZERO)
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.output.path().join(name)
    }

    pub fn work_root(&self, config: &CoreConfig) -> PathBuf {
        config.work_root()
    }
}

/// Creates a small source file so its size can be read.
pub fn create_dummy_file(dir: &Path, filename: &str) -> PathBuf {
    let file_path = dir.join(filename);
    let mut file = File::create(&file_path).expect("Failed to create dummy file");
    file.write_all(&[0u8; 8192]).expect("Failed to write dummy content");
    file_path
}

/// Scripts a ten minute 1080p H.264 source with one stereo AAC track.
pub fn stub_hd_source(prober: &MockMediaProber, path: &Path) {
    prober.stub_video(path, "1920", "1080", "30000/1001", "h264", "yuv420p");
    prober.stub_format(path, "600.000000", "8000000");
    prober.stub_audio(path, &[STEREO_AAC]);
}

pub fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}
