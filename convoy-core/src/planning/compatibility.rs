// ============================================================================
// convoy-core/src/planning/compatibility.rs
// ============================================================================
//
// COMPATIBILITY RESOLVER: Container, video codec and audio decisions
//
// The compatibility matrix is closed-world: a codec the container does not
// list is unsupported. Audio is decided in two independent steps. First,
// whether to copy or re-encode; second, how many streams to map. An
// undecodable stream forces first-stream-only mapping in every re-encode
// branch, whatever triggered the re-encode.
//
// KEY COMPONENTS:
// - ContainerCheck / resolve_video_container: video codec allow-list check
// - AudioPlan / resolve_audio: copy vs re-encode, sample rate, stream mapping

use std::fmt;

use serde::Serialize;

use crate::config::{AudioEncoderSpec, CompatibilityMatrix};
use crate::media::MediaDescriptor;

/// Upper bound for re-encoded audio, and the rate used when the source rate
/// is unsupported or unknown.
pub const MAX_AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Outcome of the container/video codec check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCheck {
    Allowed,
    Rejected(String),
}

impl ContainerCheck {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Checks that `container` accepts video of `codec_family`.
#[must_use]
pub fn resolve_video_container(container: &str, codec_family: &str, matrix: &CompatibilityMatrix) -> ContainerCheck {
    match matrix.container(container) {
        None => ContainerCheck::Rejected(format!("container '{container}' is not supported")),
        Some(rules) if rules.supports_video(codec_family) => ContainerCheck::Allowed,
        Some(_) => ContainerCheck::Rejected(format!(
            "container '{container}' does not accept {codec_family} video"
        )),
    }
}

/// Which source audio streams are mapped into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMapMode {
    AllAudio,
    FirstAudioOnly,
}

/// Audio codec target: stream copy or a named encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioTarget {
    Copy,
    Encode(String),
}

impl fmt::Display for AudioTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Encode(encoder) => write!(f, "{encoder}"),
        }
    }
}

/// How audio is carried into the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioPlan {
    pub target: AudioTarget,
    /// Bitrate in kbps for re-encodes.
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
    pub stream_map: StreamMapMode,
}

impl AudioPlan {
    #[must_use]
    pub fn copy_all() -> Self {
        Self {
            target: AudioTarget::Copy,
            bitrate_kbps: None,
            sample_rate: None,
            stream_map: StreamMapMode::AllAudio,
        }
    }

    #[must_use]
    pub fn is_copy(&self) -> bool {
        self.target == AudioTarget::Copy
    }
}

/// Audio preferences from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct AudioPreferences<'a> {
    pub preserve: bool,
    pub codec: &'a str,
    pub bitrate_kbps: u32,
}

/// Decides copy vs re-encode and the stream mapping for `descriptor`.
#[must_use]
pub fn resolve_audio(
    descriptor: &MediaDescriptor,
    container: &str,
    prefs: AudioPreferences<'_>,
    matrix: &CompatibilityMatrix,
) -> AudioPlan {
    let rules = matrix.container(container);

    let has_undecodable = descriptor.audio_streams.iter().any(|s| s.is_undecodable());
    let has_incompatible = descriptor
        .audio_streams
        .iter()
        .any(|s| !rules.is_some_and(|r| r.supports_audio(&s.codec)));

    if prefs.preserve && !has_undecodable && !has_incompatible {
        return AudioPlan::copy_all();
    }

    let codec = if prefs.preserve {
        log::info!(
            "Source audio of {} cannot be copied into {}; re-encoding",
            descriptor.path.display(),
            container
        );
        rules.map_or(prefs.codec, |r| r.default_audio_codec.as_str())
    } else {
        match rules {
            Some(r) if !r.supports_audio(prefs.codec) => {
                log::warn!(
                    "Configured audio codec {} is not allowed in {}; using {}",
                    prefs.codec,
                    container,
                    r.default_audio_codec
                );
                r.default_audio_codec.as_str()
            }
            _ => prefs.codec,
        }
    };

    let encoder = matrix.audio_encoder(codec);
    let source_rate = descriptor
        .audio_streams
        .iter()
        .find_map(|s| s.sample_rate)
        .unwrap_or(MAX_AUDIO_SAMPLE_RATE);

    let stream_map = if has_undecodable {
        log::warn!(
            "{} has an undecodable audio stream; mapping the first audio stream only",
            descriptor.path.display()
        );
        StreamMapMode::FirstAudioOnly
    } else {
        StreamMapMode::AllAudio
    };

    AudioPlan {
        target: AudioTarget::Encode(encoder.map_or_else(|| codec.to_string(), |e| e.encoder.clone())),
        bitrate_kbps: Some(prefs.bitrate_kbps),
        sample_rate: Some(choose_sample_rate(source_rate, encoder)),
        stream_map,
    }
}

/// Rates above 48 kHz drop to 48 kHz; rates the encoder supports are kept;
/// anything else becomes 48 kHz.
#[must_use]
pub fn choose_sample_rate(source_rate: u32, encoder: Option<&AudioEncoderSpec>) -> u32 {
    if source_rate > MAX_AUDIO_SAMPLE_RATE {
        MAX_AUDIO_SAMPLE_RATE
    } else if encoder.is_some_and(|e| e.sample_rates.contains(&source_rate)) {
        source_rate
    } else {
        MAX_AUDIO_SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioStreamDescriptor, BitrateProvenance, ColorMetadata};
    use std::path::PathBuf;

    fn stream(codec: &str, sample_rate: Option<u32>) -> AudioStreamDescriptor {
        AudioStreamDescriptor {
            codec: codec.to_string(),
            bitrate: Some(192_000),
            channels: Some(2),
            sample_rate,
        }
    }

    fn descriptor(streams: Vec<AudioStreamDescriptor>) -> MediaDescriptor {
        MediaDescriptor {
            path: PathBuf::from("/in/movie.mkv"),
            width: 1920,
            height: 1080,
            fps: 24.0,
            duration_seconds: 600.0,
            video_codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            color: ColorMetadata::default(),
            bit_depth: 8,
            bitrate: 10_000_000,
            bitrate_provenance: BitrateProvenance::Measured,
            audio_streams: streams,
            container_format: "matroska,webm".to_string(),
            file_size: 750_000_000,
        }
    }

    fn prefs(preserve: bool) -> AudioPreferences<'static> {
        AudioPreferences {
            preserve,
            codec: "aac",
            bitrate_kbps: 192,
        }
    }

    #[test]
    fn test_video_container_allow_list() {
        let matrix = CompatibilityMatrix::builtin();
        assert!(resolve_video_container("mp4", "hevc", &matrix).is_allowed());
        assert!(!resolve_video_container("webm", "hevc", &matrix).is_allowed());
        assert!(!resolve_video_container("flv", "h264", &matrix).is_allowed());
    }

    #[test]
    fn test_compatible_audio_is_copied() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("aac", Some(48_000)), stream("ac3", Some(48_000))]);
        assert_eq!(resolve_audio(&d, "mp4", prefs(true), &matrix), AudioPlan::copy_all());
    }

    #[test]
    fn test_incompatible_audio_uses_container_default() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("dts", Some(48_000))]);
        let plan = resolve_audio(&d, "mp4", prefs(true), &matrix);
        assert_eq!(plan.target, AudioTarget::Encode("aac".to_string()));
        assert_eq!(plan.bitrate_kbps, Some(192));
        assert_eq!(plan.sample_rate, Some(48_000));
        assert_eq!(plan.stream_map, StreamMapMode::AllAudio);
    }

    #[test]
    fn test_undecodable_stream_forces_first_only_when_preserving() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("aac", Some(44_100)), stream("unknown", None)]);
        let plan = resolve_audio(&d, "mp4", prefs(true), &matrix);
        assert!(!plan.is_copy());
        assert_eq!(plan.stream_map, StreamMapMode::FirstAudioOnly);
        assert_eq!(plan.sample_rate, Some(44_100));
    }

    #[test]
    fn test_undecodable_stream_forces_first_only_when_reencoding() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("aac", Some(48_000)), stream("none", None)]);
        let plan = resolve_audio(&d, "mkv", prefs(false), &matrix);
        assert_eq!(plan.stream_map, StreamMapMode::FirstAudioOnly);
    }

    #[test]
    fn test_reencode_without_preserve_uses_configured_codec() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("aac", Some(48_000))]);
        let plan = resolve_audio(&d, "mkv", prefs(false), &matrix);
        assert_eq!(plan.target, AudioTarget::Encode("aac".to_string()));
        assert_eq!(plan.stream_map, StreamMapMode::AllAudio);
    }

    #[test]
    fn test_configured_codec_not_in_container_falls_back() {
        let matrix = CompatibilityMatrix::builtin();
        let d = descriptor(vec![stream("opus", Some(48_000))]);
        let plan = resolve_audio(&d, "webm", prefs(false), &matrix);
        assert_eq!(plan.target, AudioTarget::Encode("libopus".to_string()));
    }

    #[test]
    fn test_sample_rate_rule() {
        let matrix = CompatibilityMatrix::builtin();
        let opus = matrix.audio_encoder("opus");
        assert_eq!(choose_sample_rate(96_000, opus), 48_000);
        assert_eq!(choose_sample_rate(24_000, opus), 24_000);
        assert_eq!(choose_sample_rate(44_100, opus), 48_000);
        assert_eq!(choose_sample_rate(44_100, None), 48_000);
    }
}
