// ============================================================================
// convoy-core/src/media/descriptor.rs
// ============================================================================
//
// MEDIA DESCRIPTOR BUILDER: Normalizes prober output into one description
//
// Every field is queried individually and run through its own fallback chain,
// so a file with partial metadata still produces a usable descriptor. Only a
// failure to read the file itself is fatal for the file.
//
// KEY COMPONENTS:
// - MediaDescriptor: Normalized view of a source file
// - build_descriptor: Prober queries plus fallback chains
// - infer_bit_depth: Ordered bit depth inference

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::external::{FieldSelector, FileMetadataProvider, MediaProber, is_field_unavailable};
use crate::utils::{extension_lowercase, parse_frame_rate};

/// Sentinel used for textual fields the prober could not supply.
pub const UNKNOWN: &str = "unknown";

/// Bit depth assumed when nothing else identifies it.
pub const DEFAULT_BIT_DEPTH: u8 = 10;

/// Where the video bitrate figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateProvenance {
    /// Read from stream or container metadata.
    Measured,
    /// Derived from file size and duration.
    Estimated,
    /// Not available; the value is zero and never caps.
    Unknown,
}

/// Colour signalling copied verbatim from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorMetadata {
    pub primaries: String,
    pub transfer: String,
    pub space: String,
    pub range: String,
}

impl Default for ColorMetadata {
    fn default() -> Self {
        Self {
            primaries: UNKNOWN.to_string(),
            transfer: UNKNOWN.to_string(),
            space: UNKNOWN.to_string(),
            range: UNKNOWN.to_string(),
        }
    }
}

impl ColorMetadata {
    /// Wide-gamut primaries or an HDR transfer function.
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        self.primaries.to_ascii_lowercase().starts_with("bt2020")
            || matches!(
                self.transfer.to_ascii_lowercase().as_str(),
                "smpte2084" | "arib-std-b67"
            )
    }
}

/// One audio stream of the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioStreamDescriptor {
    pub codec: String,
    pub bitrate: Option<u64>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
}

impl AudioStreamDescriptor {
    /// Streams the prober could not identify.
    #[must_use]
    pub fn is_undecodable(&self) -> bool {
        let codec = self.codec.trim();
        codec.is_empty() || codec.eq_ignore_ascii_case(UNKNOWN) || codec.eq_ignore_ascii_case("none")
    }
}

/// Normalized description of a source media file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    /// Zero when the prober could not report a usable resolution.
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_seconds: f64,
    pub video_codec: String,
    pub pixel_format: String,
    pub color: ColorMetadata,
    pub bit_depth: u8,
    /// Video bitrate in bits per second.
    pub bitrate: u64,
    pub bitrate_provenance: BitrateProvenance,
    pub audio_streams: Vec<AudioStreamDescriptor>,
    pub container_format: String,
    pub file_size: u64,
}

impl MediaDescriptor {
    /// The longer edge of the frame.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Whether both dimensions were probed successfully.
    #[must_use]
    pub fn has_resolution(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Builds the descriptor for `path`.
///
/// Individual prober failures degrade to the field's fallback; the call only
/// fails when the file itself cannot be read.
pub fn build_descriptor<P, M>(
    prober: &P,
    metadata: &M,
    path: &Path,
    assumed_audio_bitrate: u64,
) -> CoreResult<MediaDescriptor>
where
    P: MediaProber + ?Sized,
    M: FileMetadataProvider + ?Sized,
{
    let file_size = metadata.get_size(path).map_err(|e| CoreError::ProbeFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let query = FieldReader { prober, path };

    let width = query.first(FieldSelector::video("width")).and_then(|v| v.parse::<u32>().ok());
    let height = query.first(FieldSelector::video("height")).and_then(|v| v.parse::<u32>().ok());
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            log::warn!(
                "Could not determine resolution of {}; default parameters will be used",
                path.display()
            );
            (0, 0)
        }
    };

    let fps = query
        .first(FieldSelector::video("r_frame_rate"))
        .and_then(|v| parse_frame_rate(&v))
        .or_else(|| {
            query
                .first(FieldSelector::video("avg_frame_rate"))
                .and_then(|v| parse_frame_rate(&v))
        })
        .unwrap_or(0.0);

    let duration_seconds = query
        .first(FieldSelector::format("duration"))
        .or_else(|| query.first(FieldSelector::video("duration")))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    let video_codec = query.first_or_unknown(FieldSelector::video("codec_name"));
    let pixel_format = query.first_or_unknown(FieldSelector::video("pix_fmt"));

    let color = ColorMetadata {
        primaries: query.first_or_unknown(FieldSelector::video("color_primaries")),
        transfer: query.first_or_unknown(FieldSelector::video("color_transfer")),
        space: query.first_or_unknown(FieldSelector::video("color_space")),
        range: query.first_or_unknown(FieldSelector::video("color_range")),
    };

    let bit_depth = infer_bit_depth(
        query.first(FieldSelector::video("bits_per_raw_sample")).as_deref(),
        &pixel_format,
        query.first(FieldSelector::video("profile")).as_deref(),
        &video_codec,
    );

    let measured = query
        .first(FieldSelector::video("bit_rate"))
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|b| *b > 0)
        .or_else(|| {
            query
                .first(FieldSelector::format("bit_rate"))
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|b| *b > 0)
        });
    let (bitrate, bitrate_provenance) = match measured {
        Some(b) => (b, BitrateProvenance::Measured),
        None => estimate_video_bitrate(file_size, duration_seconds, assumed_audio_bitrate),
    };

    let audio_streams = read_audio_streams(&query);

    let container_format = query
        .first(FieldSelector::format("format_name"))
        .or_else(|| extension_lowercase(path))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let descriptor = MediaDescriptor {
        path: path.to_path_buf(),
        width,
        height,
        fps,
        duration_seconds,
        video_codec,
        pixel_format,
        color,
        bit_depth,
        bitrate,
        bitrate_provenance,
        audio_streams,
        container_format,
        file_size,
    };

    log::debug!("Descriptor for {}: {:?}", path.display(), descriptor);
    Ok(descriptor)
}

struct FieldReader<'a, P: ?Sized> {
    prober: &'a P,
    path: &'a Path,
}

impl<P: MediaProber + ?Sized> FieldReader<'_, P> {
    fn all(&self, selector: FieldSelector) -> Vec<String> {
        match self.prober.query(self.path, selector) {
            Ok(values) => values,
            Err(e) => {
                log::debug!("Probe of '{}' failed for {}: {}", selector.field, self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn first(&self, selector: FieldSelector) -> Option<String> {
        self.all(selector)
            .into_iter()
            .next()
            .filter(|v| !is_field_unavailable(v))
            .map(|v| v.trim().to_string())
    }

    fn first_or_unknown(&self, selector: FieldSelector) -> String {
        self.first(selector).unwrap_or_else(|| UNKNOWN.to_string())
    }
}

fn read_audio_streams<P: MediaProber + ?Sized>(query: &FieldReader<'_, P>) -> Vec<AudioStreamDescriptor> {
    let codecs = query.all(FieldSelector::audio("codec_name"));
    let bitrates = query.all(FieldSelector::audio("bit_rate"));
    let channels = query.all(FieldSelector::audio("channels"));
    let sample_rates = query.all(FieldSelector::audio("sample_rate"));

    let at = |values: &[String], index: usize| -> Option<String> {
        values
            .get(index)
            .filter(|v| !is_field_unavailable(v))
            .map(|v| v.trim().to_string())
    };

    (0..codecs.len())
        .map(|i| AudioStreamDescriptor {
            codec: at(&codecs, i).unwrap_or_else(|| UNKNOWN.to_string()),
            bitrate: at(&bitrates, i).and_then(|v| v.parse().ok()),
            channels: at(&channels, i).and_then(|v| v.parse().ok()),
            sample_rate: at(&sample_rates, i).and_then(|v| v.parse().ok()),
        })
        .collect()
}

/// Video bitrate derived from the file size when metadata has none.
///
/// The assumed audio share is subtracted from the overall rate; when that
/// leaves nothing, 90% of the overall rate is used instead.
#[must_use]
pub fn estimate_video_bitrate(file_size: u64, duration_seconds: f64, assumed_audio_bitrate: u64) -> (u64, BitrateProvenance) {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) || file_size == 0 {
        return (0, BitrateProvenance::Unknown);
    }
    let total = (file_size as f64 * 8.0 / duration_seconds).round() as u64;
    let video = if total > assumed_audio_bitrate {
        total - assumed_audio_bitrate
    } else {
        (total as f64 * 0.9).round() as u64
    };
    (video, BitrateProvenance::Estimated)
}

/// Infers bit depth from, in order: the raw sample size, the pixel format
/// name, the codec profile, the codec family; otherwise [`DEFAULT_BIT_DEPTH`].
#[must_use]
pub fn infer_bit_depth(bits_per_raw_sample: Option<&str>, pixel_format: &str, profile: Option<&str>, codec: &str) -> u8 {
    if let Some(bits) = bits_per_raw_sample
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|b| *b > 0)
    {
        return bits;
    }
    if let Some(bits) = bit_depth_from_pixel_format(pixel_format) {
        return bits;
    }
    if let Some(bits) = profile.and_then(bit_depth_from_profile) {
        return bits;
    }
    if let Some(bits) = bit_depth_from_codec(codec) {
        return bits;
    }
    DEFAULT_BIT_DEPTH
}

const EIGHT_BIT_PIXEL_FORMATS: &[&str] = &[
    "yuv420p", "yuvj420p", "yuv422p", "yuvj422p", "yuv444p", "yuvj444p", "yuv411p", "yuv410p", "yuva420p", "nv12",
    "nv21", "gray", "rgb24", "bgr24", "rgba", "bgra",
];

fn bit_depth_from_pixel_format(pixel_format: &str) -> Option<u8> {
    let fmt = pixel_format.to_ascii_lowercase();
    if fmt.contains("p010") || fmt.ends_with("10le") || fmt.ends_with("10be") {
        Some(10)
    } else if fmt.ends_with("12le") || fmt.ends_with("12be") {
        Some(12)
    } else if fmt.ends_with("14le") || fmt.ends_with("14be") {
        Some(14)
    } else if fmt.contains("p016") || fmt.ends_with("16le") || fmt.ends_with("16be") {
        Some(16)
    } else if EIGHT_BIT_PIXEL_FORMATS.contains(&fmt.as_str()) {
        Some(8)
    } else {
        None
    }
}

fn bit_depth_from_profile(profile: &str) -> Option<u8> {
    let profile = profile.to_ascii_lowercase();
    if profile.contains("main 10") || profile.contains("high 10") || profile.contains("main10") {
        Some(10)
    } else if profile.contains("main 12") || profile.contains("main12") {
        Some(12)
    } else if matches!(
        profile.as_str(),
        "main" | "high" | "baseline" | "constrained baseline" | "main still picture"
    ) {
        Some(8)
    } else {
        None
    }
}

fn bit_depth_from_codec(codec: &str) -> Option<u8> {
    match codec.to_ascii_lowercase().as_str() {
        "h264" | "mpeg1video" | "mpeg2video" | "mpeg4" | "msmpeg4v3" | "vc1" | "wmv3" | "mjpeg" | "vp8" => Some(8),
        "prores" => Some(10),
        _ => None,
    }
}
