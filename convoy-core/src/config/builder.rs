// ============================================================================
// convoy-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Every preference starts at its default;
// only the paths are usually set. Validation against the conversion tables
// happens separately in CoreConfig::validate.

use std::path::PathBuf;
use std::time::Duration;

use super::{CoreConfig, PreviewSettings};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use convoy_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir(PathBuf::from("/in"))
///     .output_dir(PathBuf::from("/out"))
///     .bitrate_modifier(0.8)
///     .build();
///
/// assert_eq!(config.log_dir, PathBuf::from("/out/logs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    config: CoreConfig,
}

impl CoreConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn input_dir(mut self, input_dir: PathBuf) -> Self {
        self.input_dir = Some(input_dir);
        self
    }

    #[must_use]
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = Some(output_dir);
        self
    }

    /// Sets the log directory. Defaults to `<output_dir>/logs`.
    #[must_use]
    pub fn log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = Some(log_dir);
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.config.temp_dir = Some(temp_dir);
        self
    }

    #[must_use]
    pub fn video_codec(mut self, codec: &str) -> Self {
        self.config.video_codec = codec.to_string();
        self
    }

    #[must_use]
    pub fn target_container(mut self, container: &str) -> Self {
        self.config.target_container = Some(container.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn preserve_audio(mut self, preserve: bool) -> Self {
        self.config.preserve_audio = preserve;
        self
    }

    #[must_use]
    pub fn audio_codec(mut self, codec: &str) -> Self {
        self.config.audio_codec = codec.to_string();
        self
    }

    #[must_use]
    pub fn audio_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.config.audio_bitrate_kbps = kbps;
        self
    }

    #[must_use]
    pub fn bitrate_modifier(mut self, modifier: f64) -> Self {
        self.config.bitrate_modifier = modifier;
        self
    }

    #[must_use]
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.config.skip_existing = skip;
        self
    }

    #[must_use]
    pub fn encoder_preset(mut self, preset: &str) -> Self {
        self.config.encoder_preset = Some(preset.to_string());
        self
    }

    #[must_use]
    pub fn hardware_decode(mut self, enabled: bool) -> Self {
        self.config.hardware_decode = enabled;
        self
    }

    #[must_use]
    pub fn preview(mut self, preview: PreviewSettings) -> Self {
        self.config.preview = Some(preview);
        self
    }

    #[must_use]
    pub fn size_settle_delay(mut self, delay: Duration) -> Self {
        self.config.size_settle_delay = delay;
        self
    }

    #[must_use]
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Builds the configuration. Missing paths default to the current directory.
    #[must_use]
    pub fn build(self) -> CoreConfig {
        let output_dir = self.output_dir.unwrap_or_else(|| PathBuf::from("."));
        let log_dir = self.log_dir.unwrap_or_else(|| output_dir.join("logs"));
        CoreConfig {
            input_dir: self.input_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_dir,
            log_dir,
            ..self.config
        }
    }
}
