//! ffprobe integration.
//!
//! The engine asks the prober for one field at a time for a given scope (first
//! video stream, every audio stream, or the container) and receives one text
//! value per matching stream. Empty and `N/A` values mean "field unavailable";
//! interpreting them is left to the descriptor builder's fallback chains.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ffprobe::{FfProbe, FfProbeError, Stream, ffprobe};

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

/// Which part of the file a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamScope {
    /// The first video stream (`v:0`).
    FirstVideo,
    /// Every audio stream, in stream order.
    AllAudio,
    /// The container (`format` section).
    Format,
}

/// A field within a scope, e.g. `width` of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    pub scope: StreamScope,
    pub field: &'static str,
}

impl FieldSelector {
    #[must_use]
    pub const fn video(field: &'static str) -> Self {
        Self {
            scope: StreamScope::FirstVideo,
            field,
        }
    }

    #[must_use]
    pub const fn audio(field: &'static str) -> Self {
        Self {
            scope: StreamScope::AllAudio,
            field,
        }
    }

    #[must_use]
    pub const fn format(field: &'static str) -> Self {
        Self {
            scope: StreamScope::Format,
            field,
        }
    }
}

/// True for prober responses that carry no information.
#[must_use]
pub fn is_field_unavailable(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("N/A")
}

/// The media prober contract.
pub trait MediaProber {
    /// Returns one value per stream matching the selector's scope.
    fn query(&self, path: &Path, selector: FieldSelector) -> CoreResult<Vec<String>>;
}

/// [`MediaProber`] backed by the `ffprobe` crate.
///
/// The descriptor builder asks for a dozen fields per file, so the last probed
/// file is kept and ffprobe runs once per path.
#[derive(Debug, Default)]
pub struct FfprobeCli {
    last: Mutex<Option<(PathBuf, FfProbe)>>,
}

impl FfprobeCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn probe(&self, path: &Path) -> CoreResult<FfProbe> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| CoreError::ProbeFailed {
                path: path.display().to_string(),
                message: "prober cache lock poisoned".to_string(),
            })?;

        if let Some((cached_path, metadata)) = last.as_ref() {
            if cached_path == path {
                return Ok(metadata.clone());
            }
        }

        log::trace!("Running ffprobe on {}", path.display());
        let metadata = ffprobe(path).map_err(|err| map_ffprobe_error(err, path))?;
        *last = Some((path.to_path_buf(), metadata.clone()));
        Ok(metadata)
    }
}

impl MediaProber for FfprobeCli {
    fn query(&self, path: &Path, selector: FieldSelector) -> CoreResult<Vec<String>> {
        let metadata = self.probe(path)?;
        Ok(select_values(&metadata, selector))
    }
}

/// Maps an ffprobe crate error onto the engine's error type.
fn map_ffprobe_error(err: FfProbeError, path: &Path) -> CoreError {
    let context = format!("ffprobe ({})", path.display());
    match err {
        FfProbeError::Io(io_err) => command_start_error(context, io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(context, output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::Json(err),
        _ => CoreError::ProbeFailed {
            path: path.display().to_string(),
            message: format!("unknown ffprobe error: {err:?}"),
        },
    }
}

/// Reads the selected field out of parsed ffprobe output.
///
/// Missing values are dropped for the single-valued scopes. For audio every
/// stream yields an entry so the columns of different fields stay aligned.
fn select_values(metadata: &FfProbe, selector: FieldSelector) -> Vec<String> {
    match selector.scope {
        StreamScope::FirstVideo => metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(|s| stream_field(s, selector.field))
            .into_iter()
            .collect(),
        StreamScope::AllAudio => metadata
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("audio"))
            .map(|s| stream_field(s, selector.field).unwrap_or_default())
            .collect(),
        StreamScope::Format => {
            let format = &metadata.format;
            let value = match selector.field {
                "format_name" => Some(format.format_name.clone()),
                "duration" => format.duration.clone(),
                "bit_rate" => format.bit_rate.clone(),
                _ => None,
            };
            value.into_iter().collect()
        }
    }
}

fn stream_field(stream: &Stream, field: &str) -> Option<String> {
    match field {
        "width" => stream.width.map(|v| v.to_string()),
        "height" => stream.height.map(|v| v.to_string()),
        "r_frame_rate" => Some(stream.r_frame_rate.clone()),
        "avg_frame_rate" => Some(stream.avg_frame_rate.clone()),
        "duration" => stream.duration.clone(),
        "codec_name" => stream.codec_name.clone(),
        "pix_fmt" => stream.pix_fmt.clone(),
        "profile" => stream.profile.clone(),
        "bits_per_raw_sample" => stream.bits_per_raw_sample.clone(),
        "color_primaries" => stream.color_primaries.clone(),
        "color_transfer" => stream.color_transfer.clone(),
        "color_space" => stream.color_space.clone(),
        "color_range" => stream.color_range.clone(),
        "bit_rate" => stream.bit_rate.clone(),
        "channels" => stream.channels.map(|v| v.to_string()),
        "sample_rate" => stream.sample_rate.clone(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffprobe::Format;

    fn video_stream() -> Stream {
        let mut stream = Stream::default();
        stream.codec_type = Some("video".to_string());
        stream.codec_name = Some("h264".to_string());
        stream.width = Some(1920);
        stream.height = Some(1080);
        stream.r_frame_rate = "24000/1001".to_string();
        stream.color_transfer = Some("smpte2084".to_string());
        stream
    }

    fn audio_stream(codec: &str, channels: i64, bit_rate: Option<&str>) -> Stream {
        let mut stream = Stream::default();
        stream.codec_type = Some("audio".to_string());
        stream.codec_name = Some(codec.to_string());
        stream.channels = Some(channels);
        stream.bit_rate = bit_rate.map(str::to_string);
        stream
    }

    fn metadata() -> FfProbe {
        let mut format = Format::default();
        format.format_name = "matroska,webm".to_string();
        format.duration = Some("5400.5".to_string());
        FfProbe {
            streams: vec![
                audio_stream("aac", 2, Some("128000")),
                video_stream(),
                audio_stream("ac3", 6, None),
            ],
            format,
        }
    }

    #[test]
    fn test_unavailable_values() {
        assert!(is_field_unavailable(""));
        assert!(is_field_unavailable("  "));
        assert!(is_field_unavailable("N/A"));
        assert!(is_field_unavailable("n/a"));
        assert!(!is_field_unavailable("1920"));
        assert!(!is_field_unavailable("unknown"));
    }

    #[test]
    fn test_first_video_stream_fields() {
        let metadata = metadata();
        assert_eq!(select_values(&metadata, FieldSelector::video("width")), vec!["1920"]);
        assert_eq!(select_values(&metadata, FieldSelector::video("codec_name")), vec!["h264"]);
        assert_eq!(select_values(&metadata, FieldSelector::video("r_frame_rate")), vec!["24000/1001"]);
        assert_eq!(select_values(&metadata, FieldSelector::video("color_transfer")), vec!["smpte2084"]);
        assert!(select_values(&metadata, FieldSelector::video("pix_fmt")).is_empty());
        assert!(select_values(&metadata, FieldSelector::video("no_such_field")).is_empty());
    }

    #[test]
    fn test_audio_columns_stay_aligned() {
        let metadata = metadata();
        assert_eq!(select_values(&metadata, FieldSelector::audio("codec_name")), vec!["aac", "ac3"]);
        assert_eq!(select_values(&metadata, FieldSelector::audio("channels")), vec!["2", "6"]);
        assert_eq!(select_values(&metadata, FieldSelector::audio("bit_rate")), vec!["128000", ""]);
    }

    #[test]
    fn test_format_fields() {
        let metadata = metadata();
        assert_eq!(select_values(&metadata, FieldSelector::format("duration")), vec!["5400.5"]);
        assert_eq!(select_values(&metadata, FieldSelector::format("format_name")), vec!["matroska,webm"]);
        assert!(select_values(&metadata, FieldSelector::format("bit_rate")).is_empty());
    }

    #[test]
    fn test_file_without_video_stream() {
        let metadata = FfProbe {
            streams: vec![audio_stream("flac", 2, None)],
            format: Format::default(),
        };
        assert!(select_values(&metadata, FieldSelector::video("width")).is_empty());
    }
}
