//! Video encoder catalogue.
//!
//! Maps the user-facing codec key (the ffmpeg encoder name) to everything the
//! planner needs to know about it: codec family for container checks, whether
//! it runs on the CPU or a GPU, supported bit depth, how presets are passed and
//! how its two-pass statistics are configured.

use serde::{Deserialize, Serialize};

/// How a software encoder is told which pass it is running and where its
/// statistics live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoPassStyle {
    /// ffmpeg's generic `-pass N -passlogfile <prefix>`.
    PassFlag,
    /// libx265 private options: `-x265-params pass=N:stats=<file>`.
    X265Params,
}

/// Description of one video encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCodecSpec {
    /// ffmpeg encoder name, also the lookup key (e.g. "libx265").
    pub encoder: String,
    /// Codec family as reported by ffprobe and used by the compatibility matrix.
    pub family: String,
    /// Software encoders run two-pass on the CPU and never request hardware decode.
    pub software: bool,
    /// Highest output bit depth the encoder is used with (8 or 10).
    pub max_bit_depth: u8,
    /// Option used to pass the preset ("-preset", "-cpu-used").
    pub preset_flag: String,
    pub default_preset: String,
    #[serde(default = "default_two_pass")]
    pub two_pass: TwoPassStyle,
    pub pix_fmt_8bit: String,
    pub pix_fmt_10bit: String,
}

fn default_two_pass() -> TwoPassStyle {
    TwoPassStyle::PassFlag
}

impl VideoCodecSpec {
    /// Pixel format for the given target bit depth.
    #[must_use]
    pub fn pixel_format(&self, bit_depth: u8) -> &str {
        if bit_depth >= 10 {
            &self.pix_fmt_10bit
        } else {
            &self.pix_fmt_8bit
        }
    }
}

/// The set of encoders the planner can target.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecCatalog {
    codecs: Vec<VideoCodecSpec>,
}

impl CodecCatalog {
    #[must_use]
    pub fn new(codecs: Vec<VideoCodecSpec>) -> Self {
        Self { codecs }
    }

    /// Looks up an encoder by key, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&VideoCodecSpec> {
        self.codecs.iter().find(|c| c.encoder.eq_ignore_ascii_case(key))
    }

    #[must_use]
    pub fn codecs(&self) -> &[VideoCodecSpec] {
        &self.codecs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    #[must_use]
    pub fn builtin() -> Self {
        fn spec(
            encoder: &str,
            family: &str,
            software: bool,
            max_bit_depth: u8,
            preset: (&str, &str),
            two_pass: TwoPassStyle,
            pix_fmts: (&str, &str),
        ) -> VideoCodecSpec {
            VideoCodecSpec {
                encoder: encoder.to_string(),
                family: family.to_string(),
                software,
                max_bit_depth,
                preset_flag: preset.0.to_string(),
                default_preset: preset.1.to_string(),
                two_pass,
                pix_fmt_8bit: pix_fmts.0.to_string(),
                pix_fmt_10bit: pix_fmts.1.to_string(),
            }
        }

        use TwoPassStyle::{PassFlag, X265Params};
        Self::new(vec![
            spec("libx264", "h264", true, 8, ("-preset", "medium"), PassFlag, ("yuv420p", "yuv420p")),
            spec("libx265", "hevc", true, 10, ("-preset", "medium"), X265Params, ("yuv420p", "yuv420p10le")),
            spec("libaom-av1", "av1", true, 10, ("-cpu-used", "4"), PassFlag, ("yuv420p", "yuv420p10le")),
            spec("libvpx-vp9", "vp9", true, 10, ("-cpu-used", "2"), PassFlag, ("yuv420p", "yuv420p10le")),
            spec("h264_nvenc", "h264", false, 8, ("-preset", "p5"), PassFlag, ("yuv420p", "yuv420p")),
            spec("hevc_nvenc", "hevc", false, 10, ("-preset", "p5"), PassFlag, ("yuv420p", "p010le")),
            spec("av1_nvenc", "av1", false, 10, ("-preset", "p5"), PassFlag, ("yuv420p", "p010le")),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = CodecCatalog::builtin();
        let spec = catalog.get("HEVC_NVENC").unwrap();
        assert_eq!(spec.family, "hevc");
        assert!(!spec.software);
        assert!(catalog.get("libfoo").is_none());
    }

    #[test]
    fn test_pixel_format_by_depth() {
        let catalog = CodecCatalog::builtin();
        let x265 = catalog.get("libx265").unwrap();
        assert_eq!(x265.pixel_format(10), "yuv420p10le");
        assert_eq!(x265.pixel_format(8), "yuv420p");
        assert_eq!(x265.two_pass, TwoPassStyle::X265Params);
    }
}
