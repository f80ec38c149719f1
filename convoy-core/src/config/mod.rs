//! Configuration structures and constants for the convoy-core library.
//!
//! Two kinds of configuration flow into the engine:
//!
//! - [`CoreConfig`]: per-run preferences and paths, usually built by the CLI.
//! - [`ConversionTables`]: static decision data (rate ladder, compatibility
//!   matrix, encoder catalogue), loaded and validated once.
//!
//! Both are immutable once processing starts and are passed by reference into
//! the resolver, compiler and engine.

mod builder;
pub mod codecs;
pub mod compatibility;
pub mod profiles;
pub mod tables;

use std::path::PathBuf;
use std::time::Duration;

pub use builder::CoreConfigBuilder;
pub use codecs::{CodecCatalog, TwoPassStyle, VideoCodecSpec};
pub use compatibility::{AudioEncoderSpec, CompatibilityMatrix, ContainerRules, HwDecodeHint};
pub use profiles::{RateLadder, RateProfile};
pub use tables::{ConversionTables, FallbackParameters};

use crate::error::{CoreError, CoreResult};

// Default constants

/// Default video encoder key.
pub const DEFAULT_VIDEO_CODEC: &str = "libx265";

/// Default audio codec used when audio is re-encoded by request.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Fixed audio bitrate for every re-encode branch, in kbps.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;

/// Multiplier applied to every profile's base bitrate.
pub const DEFAULT_BITRATE_MODIFIER: f64 = 1.0;

/// Length of the quality preview clip in seconds.
pub const DEFAULT_PREVIEW_CLIP_SECONDS: f64 = 10.0;

/// Pause before re-reading the size of a just-written output file.
pub const DEFAULT_SIZE_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Name of the workspace root directory created inside the temp dir.
pub const WORK_DIR_NAME: &str = "convoy-work";

/// Extensions picked up by input discovery.
pub const DEFAULT_INPUT_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "mov", "m4v", "avi", "ts", "m2ts", "mts", "webm", "wmv", "mpg", "mpeg", "vob", "flv",
];

/// Where the quality preview clip is cut from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewStart {
    /// Offset in seconds from the start of the file.
    Offset(f64),
    /// Centre of the file, computed from its duration.
    Middle,
}

impl std::str::FromStr for PreviewStart {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("middle") {
            return Ok(Self::Middle);
        }
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(Self::Offset)
            .ok_or_else(|| CoreError::Config(format!("invalid preview start '{s}' (expected seconds or 'middle')")))
    }
}

/// Perceptual metric computed for the preview clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMetric {
    Vmaf,
    Ssim,
    Psnr,
}

impl QualityMetric {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vmaf => "VMAF",
            Self::Ssim => "SSIM",
            Self::Psnr => "PSNR",
        }
    }
}

impl std::str::FromStr for QualityMetric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vmaf" => Ok(Self::Vmaf),
            "ssim" => Ok(Self::Ssim),
            "psnr" => Ok(Self::Psnr),
            other => Err(CoreError::Config(format!("unknown quality metric '{other}'"))),
        }
    }
}

/// Settings for the optional short-clip quality preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSettings {
    pub clip_seconds: f64,
    pub start: PreviewStart,
    pub metric: QualityMetric,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            clip_seconds: DEFAULT_PREVIEW_CLIP_SECONDS,
            start: PreviewStart::Middle,
            metric: QualityMetric::Vmaf,
        }
    }
}

/// Main configuration structure for the convoy-core library.
///
/// Holds paths and the user's conversion preferences. The static tables live
/// in [`ConversionTables`] and are passed alongside.
///
/// # Examples
///
/// ```rust,no_run
/// use convoy_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir(PathBuf::from("/path/to/input"))
///     .output_dir(PathBuf::from("/path/to/output"))
///     .video_codec("hevc_nvenc")
///     .target_container("mp4")
///     .skip_existing(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory containing input media files
    pub input_dir: PathBuf,

    /// Directory where converted files are written
    pub output_dir: PathBuf,

    /// Directory for run logs and summaries
    pub log_dir: PathBuf,

    /// Directory that receives the `convoy-work` workspace root (defaults to `output_dir`)
    pub temp_dir: Option<PathBuf>,

    /// Encoder key from the codec catalogue
    pub video_codec: String,

    /// Target container extension; `None` keeps each source's container
    pub target_container: Option<String>,

    /// Stream-copy audio when every source stream fits the target container
    pub preserve_audio: bool,

    /// Audio codec for requested re-encodes
    pub audio_codec: String,

    /// Bitrate for every audio re-encode, in kbps
    pub audio_bitrate_kbps: u32,

    /// Multiplier applied to the resolved profile bitrate
    pub bitrate_modifier: f64,

    /// Skip files whose final output already exists
    pub skip_existing: bool,

    /// Preset override; `None` uses the codec's default preset
    pub encoder_preset: Option<String>,

    /// Allow GPU decode for hardware encoders
    pub hardware_decode: bool,

    /// Run the quality preview before each full encode
    pub preview: Option<PreviewSettings>,

    /// Pause before reading the size of a freshly renamed output
    pub size_settle_delay: Duration,

    /// Extensions considered by discovery (lowercase, no dot)
    pub extensions: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("."),
            temp_dir: None,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            target_container: None,
            preserve_audio: true,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            bitrate_modifier: DEFAULT_BITRATE_MODIFIER,
            skip_existing: false,
            encoder_preset: None,
            hardware_decode: true,
            preview: None,
            size_settle_delay: DEFAULT_SIZE_SETTLE_DELAY,
            extensions: DEFAULT_INPUT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl CoreConfig {
    /// Creates a configuration with default preferences for the given paths.
    #[must_use]
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, log_dir: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            log_dir,
            ..Self::default()
        }
    }

    /// Root directory under which per-file encode workspaces are created.
    ///
    /// Always a dedicated subdirectory, so a user-supplied temp dir is never
    /// cleaned or removed itself.
    #[must_use]
    pub fn work_root(&self) -> PathBuf {
        match &self.temp_dir {
            Some(temp_dir) => temp_dir.join(WORK_DIR_NAME),
            None => self.output_dir.join(format!(".{WORK_DIR_NAME}")),
        }
    }

    /// Checks the preferences against the tables they will be used with.
    pub fn validate(&self, tables: &ConversionTables) -> CoreResult<()> {
        if !(self.bitrate_modifier.is_finite() && self.bitrate_modifier > 0.0) {
            return Err(CoreError::Config(format!(
                "bitrate modifier must be a positive number, got {}",
                self.bitrate_modifier
            )));
        }

        if self.audio_bitrate_kbps == 0 {
            return Err(CoreError::Config("audio bitrate must be positive".to_string()));
        }

        let codec = tables.codecs.get(&self.video_codec).ok_or_else(|| {
            CoreError::Config(format!("unknown video codec '{}'", self.video_codec))
        })?;

        if let Some(container) = &self.target_container {
            let rules = tables.matrix.container(container).ok_or_else(|| {
                CoreError::Config(format!("unknown target container '{container}'"))
            })?;
            if !rules.supports_video(&codec.family) {
                return Err(CoreError::Config(format!(
                    "container '{}' does not accept {} video ({})",
                    container, codec.family, codec.encoder
                )));
            }
        }

        if tables.matrix.audio_encoder(&self.audio_codec).is_none() {
            return Err(CoreError::Config(format!("no audio encoder known for '{}'", self.audio_codec)));
        }

        if let Some(preview) = &self.preview {
            if !(preview.clip_seconds.is_finite() && preview.clip_seconds > 0.0) {
                return Err(CoreError::Config("preview clip length must be positive".to_string()));
            }
        }

        Ok(())
    }
}
