// ============================================================================
// convoy-core/src/planning/plan.rs
// ============================================================================
//
// PLAN COMPILER: One immutable conversion plan per source file
//
// Combines the media descriptor, the run configuration and the conversion
// tables into a ConversionPlan. The compiler decides the hardware tier, the
// target bit depth, HDR carry-through, the audio plan and the collision-safe
// output name, or rejects the file outright. Plans are compiled just before
// execution and discarded once the file finishes.
//
// KEY COMPONENTS:
// - ConversionPlan: Everything the execution engine needs for one file
// - HwAccelMethod / EncoderStrategy: Hardware tier and encode path
// - BatchNames: Batch-wide stem index for collision-safe naming
// - compile_plan: The compiler itself

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::compatibility::{AudioPlan, AudioPreferences, ContainerCheck, resolve_audio, resolve_video_container};
use super::rate::{ResolvedRateParameters, resolve};
use crate::config::{ConversionTables, CoreConfig, TwoPassStyle};
use crate::media::{ColorMetadata, MediaDescriptor};
use crate::utils::{extension_lowercase, with_appended_extension};

/// Decode path requested from ffmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HwAccelMethod {
    /// GPU decode feeding a GPU encoder.
    Cuda,
    /// Vendor-neutral hardware decode for sources the GPU decoder mishandles.
    D3d11va,
    /// Hardware encoder fed by CPU decode.
    SoftwareDecode,
    /// Software encoder; no hardware involvement.
    NoneSoftwareEncode,
}

impl HwAccelMethod {
    /// The `-hwaccel` value, if any.
    #[must_use]
    pub fn hwaccel_arg(&self) -> Option<&'static str> {
        match self {
            Self::Cuda => Some("cuda"),
            Self::D3d11va => Some("d3d11va"),
            Self::SoftwareDecode | Self::NoneSoftwareEncode => None,
        }
    }
}

impl fmt::Display for HwAccelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cuda => "cuda",
            Self::D3d11va => "d3d11va",
            Self::SoftwareDecode => "software-decode",
            Self::NoneSoftwareEncode => "none-software-encode",
        };
        f.write_str(name)
    }
}

/// Encode path, chosen once per plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncoderStrategy {
    /// Statistics pass followed by the real encode.
    TwoPhaseSoftware,
    /// One invocation doing everything.
    SinglePhaseHardware,
}

/// Why a file was not planned. Rejections are skips, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRejection {
    /// The preserved container cannot carry the chosen video codec.
    ContainerIncompatible(String),
    /// The final output exists and existing outputs are being skipped.
    OutputExists(PathBuf),
    /// The configured video codec is not in the catalogue.
    UnknownCodec(String),
    /// The output path resolves to the source file itself.
    OverwritesSource(PathBuf),
}

impl fmt::Display for PlanRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerIncompatible(reason) => write!(f, "{reason}"),
            Self::OutputExists(path) => write!(f, "output already exists: {}", path.display()),
            Self::UnknownCodec(codec) => write!(f, "unknown video codec '{codec}'"),
            Self::OverwritesSource(path) => write!(f, "output would overwrite the source: {}", path.display()),
        }
    }
}

/// The complete, immutable recipe for converting one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionPlan {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Always true: encodes land on `temp_output_path` and are renamed.
    pub use_temp_output: bool,
    pub temp_output_path: PathBuf,
    pub video_codec: String,
    pub codec_family: String,
    pub hw_accel: HwAccelMethod,
    pub is_software_encoder: bool,
    pub target_bit_depth: u8,
    pub pixel_format: String,
    pub rate: ResolvedRateParameters,
    pub audio: AudioPlan,
    pub preserve_subtitles: bool,
    /// Source colour signalling copied verbatim when carried through.
    pub hdr: Option<ColorMetadata>,
    pub preset_flag: String,
    pub encoder_preset: String,
    pub two_pass_style: TwoPassStyle,
    pub container: String,
    pub muxer: String,
    pub faststart: bool,
    pub duration_seconds: f64,
}

impl ConversionPlan {
    #[must_use]
    pub fn strategy(&self) -> EncoderStrategy {
        if self.is_software_encoder {
            EncoderStrategy::TwoPhaseSoftware
        } else {
            EncoderStrategy::SinglePhaseHardware
        }
    }

    #[must_use]
    pub fn hdr_carry_through(&self) -> bool {
        self.hdr.is_some()
    }

    /// One-line description of the decisions in this plan, for the run log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}), {} -> {} b/s avg, audio {}, HDR metadata {}",
            self.video_codec,
            self.hw_accel,
            self.rate.profile_name,
            self.rate.average_bitrate,
            self.audio.target,
            if self.hdr_carry_through() { "carried through" } else { "not carried" }
        )
    }
}

/// Stem index over the whole batch, used for collision-safe output names.
#[derive(Debug, Clone, Default)]
pub struct BatchNames {
    stems: HashMap<String, usize>,
}

impl BatchNames {
    pub fn new<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        let mut stems = HashMap::new();
        for file in files {
            if let Some(stem) = stem_key(file) {
                *stems.entry(stem).or_insert(0) += 1;
            }
        }
        Self { stems }
    }

    /// Whether another file in the batch shares this file's stem.
    #[must_use]
    pub fn collides(&self, path: &Path) -> bool {
        stem_key(path).is_some_and(|stem| self.stems.get(&stem).copied().unwrap_or(0) > 1)
    }
}

fn stem_key(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_lowercase())
}

/// Output path for `source` in `output_dir` with extension `container`.
///
/// When the container changes and another batch input shares the stem, the
/// source extension is appended to the stem (`video.ts` -> `video_ts.mp4`).
#[must_use]
pub fn output_path_for(
    source: &Path,
    output_dir: &Path,
    container: &str,
    container_changes: bool,
    names: &BatchNames,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let file_name = match extension_lowercase(source) {
        Some(src_ext) if container_changes && names.collides(source) => {
            format!("{stem}_{src_ext}.{container}")
        }
        _ => format!("{stem}.{container}"),
    };
    output_dir.join(file_name)
}

/// Compiles the plan for one file, or explains why it is skipped.
pub fn compile_plan(
    descriptor: &MediaDescriptor,
    config: &CoreConfig,
    tables: &ConversionTables,
    names: &BatchNames,
) -> Result<ConversionPlan, PlanRejection> {
    let codec = tables
        .codecs
        .get(&config.video_codec)
        .ok_or_else(|| PlanRejection::UnknownCodec(config.video_codec.clone()))?;

    let source_ext = extension_lowercase(&descriptor.path).unwrap_or_default();
    let container_changes = config.target_container.is_some();
    let container = config.target_container.clone().unwrap_or_else(|| source_ext.clone());

    if let ContainerCheck::Rejected(reason) = resolve_video_container(&container, &codec.family, &tables.matrix) {
        return Err(PlanRejection::ContainerIncompatible(reason));
    }
    let Some(rules) = tables.matrix.container(&container) else {
        return Err(PlanRejection::ContainerIncompatible(format!(
            "container '{container}' is not supported"
        )));
    };

    let source_path = absolute(&descriptor.path);
    let output_dir = absolute(&config.output_dir);
    let output_path = output_path_for(&source_path, &output_dir, &container, container_changes, names);

    if is_same_file(&source_path, &output_path) {
        return Err(PlanRejection::OverwritesSource(output_path));
    }
    if config.skip_existing && output_path.exists() {
        return Err(PlanRejection::OutputExists(output_path));
    }

    let hw_accel = if codec.software {
        HwAccelMethod::NoneSoftwareEncode
    } else if !config.hardware_decode {
        HwAccelMethod::SoftwareDecode
    } else if tables.is_problematic_source(&source_ext) {
        HwAccelMethod::D3d11va
    } else {
        HwAccelMethod::Cuda
    };

    let target_bit_depth = if descriptor.bit_depth >= 10 && codec.max_bit_depth >= 10 {
        10
    } else {
        8
    };

    let hdr = (target_bit_depth >= 10 && descriptor.color.is_hdr()).then(|| descriptor.color.clone());

    let rate = if descriptor.has_resolution() {
        resolve(
            &tables.ladder,
            descriptor.max_dimension(),
            descriptor.fps,
            config.bitrate_modifier,
            descriptor.bitrate,
        )
    } else {
        resolve(
            &tables.ladder,
            tables.fallback.max_dimension,
            tables.fallback.fps,
            config.bitrate_modifier,
            0,
        )
    };

    let audio = resolve_audio(
        descriptor,
        &container,
        AudioPreferences {
            preserve: config.preserve_audio,
            codec: &config.audio_codec,
            bitrate_kbps: config.audio_bitrate_kbps,
        },
        &tables.matrix,
    );

    let plan = ConversionPlan {
        temp_output_path: with_appended_extension(&output_path, "tmp"),
        source_path,
        output_path,
        use_temp_output: true,
        video_codec: codec.encoder.clone(),
        codec_family: codec.family.clone(),
        hw_accel,
        is_software_encoder: codec.software,
        target_bit_depth,
        pixel_format: codec.pixel_format(target_bit_depth).to_string(),
        rate,
        audio,
        preserve_subtitles: rules.subtitles,
        hdr,
        preset_flag: codec.preset_flag.clone(),
        encoder_preset: config
            .encoder_preset
            .clone()
            .unwrap_or_else(|| codec.default_preset.clone()),
        two_pass_style: codec.two_pass,
        container: container.clone(),
        muxer: rules.muxer.clone(),
        faststart: rules.faststart,
        duration_seconds: descriptor.duration_seconds,
    };

    log::debug!(
        "Planned {} -> {} ({}, {}, {} b/s)",
        plan.source_path.display(),
        plan.output_path.display(),
        plan.video_codec,
        plan.hw_accel,
        plan.rate.average_bitrate
    );
    Ok(plan)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Lexical match first, then canonical paths to see through symlinks and `..`.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioStreamDescriptor, BitrateProvenance};
    use crate::planning::compatibility::{AudioTarget, StreamMapMode};

    fn descriptor(path: &str) -> MediaDescriptor {
        MediaDescriptor {
            path: PathBuf::from(path),
            width: 3840,
            height: 2160,
            fps: 30.0,
            duration_seconds: 1200.0,
            video_codec: "hevc".to_string(),
            pixel_format: "yuv420p10le".to_string(),
            color: ColorMetadata::default(),
            bit_depth: 10,
            bitrate: 60_000_000,
            bitrate_provenance: BitrateProvenance::Measured,
            audio_streams: vec![AudioStreamDescriptor {
                codec: "aac".to_string(),
                bitrate: Some(256_000),
                channels: Some(2),
                sample_rate: Some(48_000),
            }],
            container_format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            file_size: 9_000_000_000,
        }
    }

    fn config(output_dir: &Path) -> CoreConfig {
        CoreConfig {
            output_dir: output_dir.to_path_buf(),
            target_container: Some("mp4".to_string()),
            ..CoreConfig::default()
        }
    }

    #[test]
    fn test_4k_end_to_end_plan() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let plan = compile_plan(&descriptor("/in/movie.mp4"), &config(out.path()), &tables, &BatchNames::default())
            .unwrap();

        assert_eq!(plan.rate.profile_name, "4K 30fps");
        assert_eq!(plan.rate.average_bitrate, 20_000_000);
        assert_eq!(plan.rate.max_rate, 30_000_000);
        assert_eq!(plan.rate.buffer_size, 40_000_000);
        assert_eq!(plan.audio.target, AudioTarget::Copy);
        assert_eq!(plan.audio.stream_map, StreamMapMode::AllAudio);
        assert_eq!(plan.strategy(), EncoderStrategy::TwoPhaseSoftware);
        assert_eq!(plan.hw_accel, HwAccelMethod::NoneSoftwareEncode);
        assert_eq!(plan.output_path, out.path().join("movie.mp4"));
        assert_eq!(plan.temp_output_path, out.path().join("movie.mp4.tmp"));
        assert!(plan.use_temp_output);
        assert!(plan.source_path.is_absolute());
    }

    #[test]
    fn test_collision_naming_is_batch_scoped() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let files = vec![PathBuf::from("/in/video.ts"), PathBuf::from("/in/video.m2ts"), PathBuf::from("/in/other.ts")];
        let names = BatchNames::new(&files);
        let cfg = config(out.path());

        let a = compile_plan(&descriptor("/in/video.ts"), &cfg, &tables, &names).unwrap();
        let b = compile_plan(&descriptor("/in/video.m2ts"), &cfg, &tables, &names).unwrap();
        let c = compile_plan(&descriptor("/in/other.ts"), &cfg, &tables, &names).unwrap();
        assert_eq!(a.output_path, out.path().join("video_ts.mp4"));
        assert_eq!(b.output_path, out.path().join("video_m2ts.mp4"));
        assert_eq!(c.output_path, out.path().join("other.mp4"));
    }

    #[test]
    fn test_preserved_container_keeps_plain_name() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let files = vec![PathBuf::from("/in/video.mkv"), PathBuf::from("/in/video.mp4")];
        let names = BatchNames::new(&files);
        let cfg = CoreConfig {
            output_dir: out.path().to_path_buf(),
            ..CoreConfig::default()
        };
        let plan = compile_plan(&descriptor("/in/video.mkv"), &cfg, &tables, &names).unwrap();
        assert_eq!(plan.output_path, out.path().join("video.mkv"));
    }

    #[test]
    fn test_preserved_container_rejects_codec() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let cfg = CoreConfig {
            output_dir: out.path().to_path_buf(),
            ..CoreConfig::default()
        };
        let result = compile_plan(&descriptor("/in/clip.webm"), &cfg, &tables, &BatchNames::default());
        assert!(matches!(result, Err(PlanRejection::ContainerIncompatible(_))));
    }

    #[test]
    fn test_existing_output_rejected_only_with_skip_existing() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("movie.mp4"), b"done").unwrap();
        let tables = ConversionTables::default();

        let mut cfg = config(out.path());
        assert!(compile_plan(&descriptor("/in/movie.mkv"), &cfg, &tables, &BatchNames::default()).is_ok());

        cfg.skip_existing = true;
        let result = compile_plan(&descriptor("/in/movie.mkv"), &cfg, &tables, &BatchNames::default());
        assert!(matches!(result, Err(PlanRejection::OutputExists(_))));
    }

    #[test]
    fn test_output_onto_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("movie.mkv");
        std::fs::write(&source, b"source").unwrap();
        let tables = ConversionTables::default();
        let cfg = CoreConfig {
            output_dir: dir.path().to_path_buf(),
            ..CoreConfig::default()
        };

        let result = compile_plan(&descriptor(source.to_str().unwrap()), &cfg, &tables, &BatchNames::default());
        assert_eq!(result, Err(PlanRejection::OverwritesSource(source.clone())));
        assert!(result.unwrap_err().to_string().contains("overwrite the source"));

        // A container change gives the output a different name.
        let cfg = config(dir.path());
        let plan = compile_plan(&descriptor(source.to_str().unwrap()), &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.output_path, dir.path().join("movie.mp4"));
    }

    #[test]
    fn test_hardware_tiers() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let mut cfg = config(out.path());
        cfg.video_codec = "hevc_nvenc".to_string();

        let plan = compile_plan(&descriptor("/in/a.mkv"), &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.hw_accel, HwAccelMethod::Cuda);
        assert_eq!(plan.strategy(), EncoderStrategy::SinglePhaseHardware);

        let plan = compile_plan(&descriptor("/in/a.vob"), &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.hw_accel, HwAccelMethod::D3d11va);

        let plan = compile_plan(&descriptor("/in/a.ts"), &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.hw_accel, HwAccelMethod::D3d11va);

        cfg.hardware_decode = false;
        let plan = compile_plan(&descriptor("/in/a.mkv"), &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.hw_accel, HwAccelMethod::SoftwareDecode);
    }

    #[test]
    fn test_hdr_carry_through_requires_ten_bit_target() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let mut source = descriptor("/in/hdr.mkv");
        source.color = ColorMetadata {
            primaries: "bt2020".to_string(),
            transfer: "smpte2084".to_string(),
            space: "bt2020nc".to_string(),
            range: "tv".to_string(),
        };

        let plan = compile_plan(&source, &config(out.path()), &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.target_bit_depth, 10);
        assert_eq!(plan.hdr.as_ref(), Some(&source.color));
        assert!(plan.summary().ends_with("HDR metadata carried through"));

        let mut cfg = config(out.path());
        cfg.video_codec = "libx264".to_string();
        let plan = compile_plan(&source, &cfg, &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.target_bit_depth, 8);
        assert!(!plan.hdr_carry_through());
        assert!(plan.summary().ends_with("HDR metadata not carried"));
    }

    #[test]
    fn test_zero_resolution_uses_fallback_without_cap() {
        let out = tempfile::tempdir().unwrap();
        let tables = ConversionTables::default();
        let mut source = descriptor("/in/broken.mkv");
        source.width = 0;
        source.height = 0;
        source.bitrate = 1_000;

        let plan = compile_plan(&source, &config(out.path()), &tables, &BatchNames::default()).unwrap();
        assert_eq!(plan.rate.profile_name, "1080p 30fps");
        assert!(!plan.rate.source_cap_applied);
    }
}
