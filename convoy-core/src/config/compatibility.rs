//! Container compatibility tables.
//!
//! The matrix is closed-world: a codec that is not listed for a container is
//! unsupported there. Containers are keyed by lowercase file extension.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hint for the decode path when a file in this container is the *source*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwDecodeHint {
    /// Use the vendor GPU decoder.
    #[default]
    Native,
    /// Known to trip the vendor decoder; use the vendor-neutral path.
    VendorNeutral,
}

/// Rules for a single container format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRules {
    /// ffmpeg muxer name, passed explicitly because the temp output ends in `.tmp`.
    pub muxer: String,
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    pub default_audio_codec: String,
    /// Whether arbitrary source subtitle streams can be stream-copied in.
    #[serde(default)]
    pub subtitles: bool,
    /// Whether `-movflags +faststart` applies.
    #[serde(default)]
    pub faststart: bool,
    #[serde(default)]
    pub hw_decode_hint: HwDecodeHint,
}

impl ContainerRules {
    #[must_use]
    pub fn supports_video(&self, family: &str) -> bool {
        self.video_codecs.iter().any(|c| c.eq_ignore_ascii_case(family))
    }

    #[must_use]
    pub fn supports_audio(&self, codec: &str) -> bool {
        self.audio_codecs.iter().any(|c| c.eq_ignore_ascii_case(codec))
    }
}

/// An audio encoder and the sample rates it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEncoderSpec {
    /// Codec name as used in the matrix ("aac", "opus").
    pub codec: String,
    /// ffmpeg encoder name ("aac", "libopus").
    pub encoder: String,
    pub sample_rates: Vec<u32>,
}

/// Container ↔ codec allow-lists plus the audio encoder table.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityMatrix {
    containers: BTreeMap<String, ContainerRules>,
    audio_encoders: Vec<AudioEncoderSpec>,
}

impl CompatibilityMatrix {
    #[must_use]
    pub fn new(containers: BTreeMap<String, ContainerRules>, audio_encoders: Vec<AudioEncoderSpec>) -> Self {
        let containers = containers
            .into_iter()
            .map(|(ext, rules)| (ext.trim_start_matches('.').to_ascii_lowercase(), rules))
            .collect();
        Self {
            containers,
            audio_encoders,
        }
    }

    /// Rules for a container extension (with or without leading dot).
    #[must_use]
    pub fn container(&self, extension: &str) -> Option<&ContainerRules> {
        self.containers
            .get(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn containers(&self) -> impl Iterator<Item = (&String, &ContainerRules)> {
        self.containers.iter()
    }

    #[must_use]
    pub fn audio_encoder(&self, codec: &str) -> Option<&AudioEncoderSpec> {
        self.audio_encoders
            .iter()
            .find(|e| e.codec.eq_ignore_ascii_case(codec))
    }

    #[must_use]
    pub fn audio_encoders(&self) -> &[AudioEncoderSpec] {
        &self.audio_encoders
    }

    #[must_use]
    pub fn builtin() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        }

        let mut containers = BTreeMap::new();
        containers.insert(
            "mp4".to_string(),
            ContainerRules {
                muxer: "mp4".to_string(),
                video_codecs: strings(&["h264", "hevc", "av1", "vp9"]),
                audio_codecs: strings(&["aac", "ac3", "eac3", "mp3", "opus", "alac"]),
                default_audio_codec: "aac".to_string(),
                subtitles: false,
                faststart: true,
                hw_decode_hint: HwDecodeHint::Native,
            },
        );
        containers.insert(
            "mov".to_string(),
            ContainerRules {
                muxer: "mov".to_string(),
                video_codecs: strings(&["h264", "hevc", "prores"]),
                audio_codecs: strings(&["aac", "alac", "ac3", "pcm_s16le", "pcm_s24le"]),
                default_audio_codec: "aac".to_string(),
                subtitles: false,
                faststart: true,
                hw_decode_hint: HwDecodeHint::Native,
            },
        );
        containers.insert(
            "mkv".to_string(),
            ContainerRules {
                muxer: "matroska".to_string(),
                video_codecs: strings(&["h264", "hevc", "av1", "vp9", "vp8", "mpeg2video", "mpeg4", "vc1", "prores"]),
                audio_codecs: strings(&[
                    "aac", "ac3", "eac3", "dts", "truehd", "opus", "flac", "mp3", "vorbis", "alac", "pcm_s16le",
                    "pcm_s24le",
                ]),
                default_audio_codec: "opus".to_string(),
                subtitles: true,
                faststart: false,
                hw_decode_hint: HwDecodeHint::Native,
            },
        );
        containers.insert(
            "webm".to_string(),
            ContainerRules {
                muxer: "webm".to_string(),
                video_codecs: strings(&["vp9", "av1", "vp8"]),
                audio_codecs: strings(&["opus", "vorbis"]),
                default_audio_codec: "opus".to_string(),
                subtitles: false,
                faststart: false,
                hw_decode_hint: HwDecodeHint::Native,
            },
        );
        for ext in ["ts", "m2ts"] {
            containers.insert(
                ext.to_string(),
                ContainerRules {
                    muxer: "mpegts".to_string(),
                    video_codecs: strings(&["h264", "hevc", "mpeg2video"]),
                    audio_codecs: strings(&["aac", "ac3", "eac3", "mp3", "mp2"]),
                    default_audio_codec: "aac".to_string(),
                    subtitles: false,
                    faststart: false,
                    hw_decode_hint: HwDecodeHint::VendorNeutral,
                },
            );
        }
        containers.insert(
            "avi".to_string(),
            ContainerRules {
                muxer: "avi".to_string(),
                video_codecs: strings(&["h264", "mpeg4"]),
                audio_codecs: strings(&["mp3", "ac3", "pcm_s16le"]),
                default_audio_codec: "mp3".to_string(),
                subtitles: false,
                faststart: false,
                hw_decode_hint: HwDecodeHint::Native,
            },
        );

        let common_rates = vec![8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000];
        let audio_encoders = vec![
            AudioEncoderSpec {
                codec: "aac".to_string(),
                encoder: "aac".to_string(),
                sample_rates: vec![8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000],
            },
            AudioEncoderSpec {
                codec: "opus".to_string(),
                encoder: "libopus".to_string(),
                sample_rates: vec![8000, 12000, 16000, 24000, 48000],
            },
            AudioEncoderSpec {
                codec: "ac3".to_string(),
                encoder: "ac3".to_string(),
                sample_rates: vec![32000, 44100, 48000],
            },
            AudioEncoderSpec {
                codec: "eac3".to_string(),
                encoder: "eac3".to_string(),
                sample_rates: vec![32000, 44100, 48000],
            },
            AudioEncoderSpec {
                codec: "mp3".to_string(),
                encoder: "libmp3lame".to_string(),
                sample_rates: common_rates.clone(),
            },
            AudioEncoderSpec {
                codec: "vorbis".to_string(),
                encoder: "libvorbis".to_string(),
                sample_rates: common_rates.clone(),
            },
            AudioEncoderSpec {
                codec: "flac".to_string(),
                encoder: "flac".to_string(),
                sample_rates: common_rates,
            },
        ];

        Self::new(containers, audio_encoders)
    }
}
