//! ffmpeg command construction for plans.
//!
//! Each function turns a [`ConversionPlan`] into the argument vector for one
//! ffmpeg invocation. Every path placed on a command line is absolute, except
//! the libx265 statistics file, which is resolved inside the encode workspace
//! the command runs in.

use std::path::Path;

use ffmpeg_sidecar::command::FfmpegCommand;

use super::workspace::X265_STATS_FILE;
use crate::config::TwoPassStyle;
use crate::planning::{AudioTarget, ConversionPlan, StreamMapMode};

/// Builder for ffmpeg commands with the options shared by every invocation.
pub struct FfmpegCommandBuilder {
    cmd: FfmpegCommand,
    hwaccel: Option<&'static str>,
}

impl Default for FfmpegCommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCommandBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cmd: FfmpegCommand::new(),
            hwaccel: None,
        }
    }

    /// Requests a hardware decode path (`-hwaccel <method>`).
    #[must_use]
    pub fn with_hwaccel(mut self, method: Option<&'static str>) -> Self {
        self.hwaccel = method;
        self
    }

    /// Builds the command up to (not including) the inputs.
    #[must_use]
    pub fn build(mut self) -> FfmpegCommand {
        self.cmd.arg("-hide_banner");
        self.cmd.overwrite();
        if let Some(method) = self.hwaccel {
            self.cmd.args(["-hwaccel", method]);
        }
        self.cmd
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Codec, preset, pixel format and rate control for the plan's video stream.
fn push_video_args(cmd: &mut FfmpegCommand, plan: &ConversionPlan) {
    cmd.args(["-c:v", plan.video_codec.as_str()]);
    cmd.args([plan.preset_flag.as_str(), plan.encoder_preset.as_str()]);
    cmd.args(["-pix_fmt", plan.pixel_format.as_str()]);
    if !plan.is_software_encoder {
        cmd.args(["-rc", "vbr"]);
    }
    cmd.arg("-b:v").arg(plan.rate.average_bitrate.to_string());
    cmd.arg("-maxrate").arg(plan.rate.max_rate.to_string());
    cmd.arg("-bufsize").arg(plan.rate.buffer_size.to_string());

    if let Some(color) = &plan.hdr {
        cmd.args(["-color_primaries", color.primaries.as_str()]);
        cmd.args(["-color_trc", color.transfer.as_str()]);
        cmd.args(["-colorspace", color.space.as_str()]);
        cmd.args(["-color_range", color.range.as_str()]);
    }
}

fn push_pass_args(cmd: &mut FfmpegCommand, plan: &ConversionPlan, pass: u8, pass_log_prefix: &Path) {
    match plan.two_pass_style {
        TwoPassStyle::PassFlag => {
            cmd.arg("-pass").arg(pass.to_string());
            cmd.arg("-passlogfile").arg(path_arg(pass_log_prefix));
        }
        TwoPassStyle::X265Params => {
            cmd.arg("-x265-params").arg(format!("pass={pass}:stats={X265_STATS_FILE}"));
        }
    }
}

fn push_audio_args(cmd: &mut FfmpegCommand, plan: &ConversionPlan) {
    match plan.audio.stream_map {
        StreamMapMode::AllAudio => cmd.args(["-map", "0:a?"]),
        StreamMapMode::FirstAudioOnly => cmd.args(["-map", "0:a:0?"]),
    };

    match &plan.audio.target {
        AudioTarget::Copy => {
            cmd.args(["-c:a", "copy"]);
        }
        AudioTarget::Encode(encoder) => {
            cmd.args(["-c:a", encoder.as_str()]);
            if let Some(kbps) = plan.audio.bitrate_kbps {
                cmd.arg("-b:a").arg(format!("{kbps}k"));
            }
            if let Some(rate) = plan.audio.sample_rate {
                cmd.arg("-ar").arg(rate.to_string());
            }
        }
    }
}

fn push_container_args(cmd: &mut FfmpegCommand, plan: &ConversionPlan) {
    if plan.preserve_subtitles {
        cmd.args(["-map", "0:s?", "-c:s", "copy"]);
    }
    cmd.args(["-map_metadata", "0", "-map_chapters", "0"]);
    if plan.faststart {
        cmd.args(["-movflags", "+faststart"]);
    }
    if plan.codec_family == "hevc" && matches!(plan.container.as_str(), "mp4" | "mov") {
        cmd.args(["-tag:v", "hvc1"]);
    }
    cmd.args(["-f", plan.muxer.as_str()]);
    cmd.output(path_arg(&plan.temp_output_path));
}

fn base_command(plan: &ConversionPlan) -> FfmpegCommand {
    let mut cmd = FfmpegCommandBuilder::new()
        .with_hwaccel(plan.hw_accel.hwaccel_arg())
        .build();
    cmd.input(path_arg(&plan.source_path));
    cmd
}

/// Phase 1 of a two-phase encode: video only, statistics to the workspace,
/// output discarded.
#[must_use]
pub fn pass1_command(plan: &ConversionPlan, pass_log_prefix: &Path) -> FfmpegCommand {
    let mut cmd = base_command(plan);
    cmd.args(["-map", "0:v:0"]);
    push_video_args(&mut cmd, plan);
    push_pass_args(&mut cmd, plan, 1, pass_log_prefix);
    cmd.args(["-an", "-sn", "-f", "null"]);
    cmd.output("-");
    cmd
}

/// Phase 2 of a two-phase encode: the real output, reusing phase 1 statistics.
#[must_use]
pub fn pass2_command(plan: &ConversionPlan, pass_log_prefix: &Path) -> FfmpegCommand {
    let mut cmd = base_command(plan);
    cmd.args(["-map", "0:v:0"]);
    push_video_args(&mut cmd, plan);
    push_pass_args(&mut cmd, plan, 2, pass_log_prefix);
    push_audio_args(&mut cmd, plan);
    push_container_args(&mut cmd, plan);
    cmd
}

/// The single invocation used for hardware encoders.
#[must_use]
pub fn single_pass_command(plan: &ConversionPlan) -> FfmpegCommand {
    let mut cmd = base_command(plan);
    cmd.args(["-map", "0:v:0"]);
    push_video_args(&mut cmd, plan);
    push_audio_args(&mut cmd, plan);
    push_container_args(&mut cmd, plan);
    cmd
}

/// Cuts `duration` seconds from `start` by stream copy, video only.
#[must_use]
pub fn clip_extract_command(source: &Path, start: f64, duration: f64, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommandBuilder::new().build();
    cmd.arg("-ss").arg(format!("{start:.3}"));
    cmd.arg("-t").arg(format!("{duration:.3}"));
    cmd.input(path_arg(source));
    cmd.args(["-map", "0:v:0", "-c", "copy", "-an", "-sn"]);
    cmd.output(path_arg(output));
    cmd
}

/// Encodes a preview clip with the plan's video settings in a single pass.
#[must_use]
pub fn preview_encode_command(plan: &ConversionPlan, clip: &Path, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommandBuilder::new()
        .with_hwaccel(plan.hw_accel.hwaccel_arg())
        .build();
    cmd.input(path_arg(clip));
    cmd.args(["-map", "0:v:0"]);
    push_video_args(&mut cmd, plan);
    cmd.args(["-an", "-sn"]);
    cmd.output(path_arg(output));
    cmd
}

/// Compares `distorted` against `reference` with the named lavfi filter.
#[must_use]
pub fn metric_command(distorted: &Path, reference: &Path, filter: &str) -> FfmpegCommand {
    let mut cmd = FfmpegCommandBuilder::new().build();
    cmd.input(path_arg(distorted));
    cmd.input(path_arg(reference));
    cmd.arg("-lavfi").arg(format!("[0:v][1:v]{filter}"));
    cmd.args(["-f", "null"]);
    cmd.output("-");
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConversionTables, CoreConfig};
    use crate::media::{AudioStreamDescriptor, BitrateProvenance, ColorMetadata, MediaDescriptor};
    use crate::planning::{BatchNames, compile_plan};
    use std::path::PathBuf;

    fn args(cmd: &FfmpegCommand) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    fn plan(video_codec: &str, container: &str, audio_codec: &str) -> ConversionPlan {
        let descriptor = MediaDescriptor {
            path: PathBuf::from("/in/movie.mkv"),
            width: 1920,
            height: 1080,
            fps: 24.0,
            duration_seconds: 60.0,
            video_codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            color: ColorMetadata::default(),
            bit_depth: 8,
            bitrate: 20_000_000,
            bitrate_provenance: BitrateProvenance::Measured,
            audio_streams: vec![AudioStreamDescriptor {
                codec: audio_codec.to_string(),
                bitrate: None,
                channels: Some(6),
                sample_rate: Some(48_000),
            }],
            container_format: "matroska,webm".to_string(),
            file_size: 150_000_000,
        };
        let config = CoreConfig {
            output_dir: PathBuf::from("/out"),
            video_codec: video_codec.to_string(),
            target_container: Some(container.to_string()),
            ..CoreConfig::default()
        };
        compile_plan(&descriptor, &config, &ConversionTables::default(), &BatchNames::default()).unwrap()
    }

    #[test]
    fn test_pass1_is_video_only_to_null_sink() {
        let plan = plan("libx265", "mkv", "aac");
        let args = args(&pass1_command(&plan, Path::new("/work/encode_1/ffmpeg2pass")));
        assert!(has_pair(&args, "-x265-params", "pass=1:stats=x265_2pass.log"));
        assert!(args.contains(&"-an".to_string()));
        assert!(has_pair(&args, "-f", "null"));
        assert_eq!(args.last().map(String::as_str), Some("-"));
        assert!(!args.iter().any(|a| a == "-c:a"));
    }

    #[test]
    fn test_pass2_writes_temp_output_with_muxer() {
        let plan = plan("libaom-av1", "mkv", "aac");
        let args = args(&pass2_command(&plan, Path::new("/work/encode_1/ffmpeg2pass")));
        assert!(has_pair(&args, "-pass", "2"));
        assert!(has_pair(&args, "-passlogfile", "/work/encode_1/ffmpeg2pass"));
        assert!(has_pair(&args, "-c:a", "copy"));
        assert!(has_pair(&args, "-map", "0:a?"));
        assert!(has_pair(&args, "-map", "0:s?"));
        assert!(has_pair(&args, "-f", "matroska"));
        assert_eq!(args.last().map(String::as_str), Some("/out/movie.mkv.tmp"));
    }

    #[test]
    fn test_hardware_single_pass() {
        let plan = plan("hevc_nvenc", "mp4", "dts");
        let args = args(&single_pass_command(&plan));
        assert!(has_pair(&args, "-hwaccel", "cuda"));
        assert!(has_pair(&args, "-rc", "vbr"));
        assert!(has_pair(&args, "-b:v", "8000000"));
        assert!(has_pair(&args, "-maxrate", "12000000"));
        assert!(has_pair(&args, "-bufsize", "16000000"));
        assert!(has_pair(&args, "-c:a", "aac"));
        assert!(has_pair(&args, "-b:a", "192k"));
        assert!(has_pair(&args, "-ar", "48000"));
        assert!(has_pair(&args, "-tag:v", "hvc1"));
        assert!(has_pair(&args, "-movflags", "+faststart"));
        assert!(!args.iter().any(|a| a == "-pass"));
    }

    #[test]
    fn test_metric_command_filter() {
        let cmd = metric_command(Path::new("/w/enc.mkv"), Path::new("/w/ref.mkv"), "ssim");
        let args = args(&cmd);
        assert!(has_pair(&args, "-lavfi", "[0:v][1:v]ssim"));
    }
}
