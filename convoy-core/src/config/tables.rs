// ============================================================================
// convoy-core/src/config/tables.rs
// ============================================================================
//
// CONVERSION TABLES: Static decision data loaded once per run
//
// The planner is a pure function of (media descriptor, preferences, tables).
// This module owns the "tables" part: the rate ladder, the container
// compatibility matrix, the encoder catalogue and a few heuristics constants.
//
// Built-in defaults are compiled in. An optional TOML file replaces whole
// sections; anything it omits keeps the built-in value. The result is
// validated before it is handed out and is never mutated afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::codecs::{CodecCatalog, VideoCodecSpec};
use super::compatibility::{AudioEncoderSpec, CompatibilityMatrix, ContainerRules};
use super::profiles::{RateLadder, RateProfile};
use crate::error::{CoreError, CoreResult};

/// Audio share assumed when estimating a video bitrate from file size (bits/s).
pub const DEFAULT_ASSUMED_AUDIO_BITRATE: u64 = 256_000;

/// Source extensions that always take the vendor-neutral hardware decode path,
/// in addition to containers whose matrix entry carries that hint.
pub const DEFAULT_PROBLEMATIC_EXTENSIONS: &[&str] = &["vob", "mpg", "mpeg", "wtv"];

/// Parameters used in place of probed values when a probe yields no resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackParameters {
    pub max_dimension: u32,
    pub fps: f64,
}

impl Default for FallbackParameters {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            fps: 30.0,
        }
    }
}

/// On-disk shape of the tables file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TablesFile {
    profiles: Option<Vec<RateProfile>>,
    containers: Option<BTreeMap<String, ContainerRules>>,
    audio_encoders: Option<Vec<AudioEncoderSpec>>,
    codecs: Option<Vec<VideoCodecSpec>>,
    problematic_extensions: Option<Vec<String>>,
    fallback: Option<FallbackParameters>,
    assumed_audio_bitrate: Option<u64>,
}

/// Immutable decision tables shared by the resolver and the plan compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTables {
    pub ladder: RateLadder,
    pub matrix: CompatibilityMatrix,
    pub codecs: CodecCatalog,
    pub problematic_extensions: Vec<String>,
    pub fallback: FallbackParameters,
    pub assumed_audio_bitrate: u64,
}

impl Default for ConversionTables {
    fn default() -> Self {
        Self {
            ladder: RateLadder::builtin(),
            matrix: CompatibilityMatrix::builtin(),
            codecs: CodecCatalog::builtin(),
            problematic_extensions: DEFAULT_PROBLEMATIC_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            fallback: FallbackParameters::default(),
            assumed_audio_bitrate: DEFAULT_ASSUMED_AUDIO_BITRATE,
        }
    }
}

impl ConversionTables {
    /// Loads tables from a TOML file, falling back to built-ins per section.
    pub fn load(path: &Path) -> CoreResult<Self> {
        log::debug!("Loading conversion tables from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read tables file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses tables from TOML text, falling back to built-ins per section.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        let file: TablesFile = toml::from_str(contents)?;
        let defaults = Self::default();

        let ladder = match file.profiles {
            Some(profiles) => RateLadder::new(profiles)?,
            None => defaults.ladder,
        };

        let matrix = match (file.containers, file.audio_encoders) {
            (None, None) => defaults.matrix,
            (containers, encoders) => CompatibilityMatrix::new(
                containers.unwrap_or_else(|| defaults.matrix.containers().map(|(k, v)| (k.clone(), v.clone())).collect()),
                encoders.unwrap_or_else(|| defaults.matrix.audio_encoders().to_vec()),
            ),
        };

        let tables = Self {
            ladder,
            matrix,
            codecs: file.codecs.map_or(defaults.codecs, CodecCatalog::new),
            problematic_extensions: file
                .problematic_extensions
                .map(|exts| exts.into_iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect())
                .unwrap_or(defaults.problematic_extensions),
            fallback: file.fallback.unwrap_or(defaults.fallback),
            assumed_audio_bitrate: file.assumed_audio_bitrate.unwrap_or(defaults.assumed_audio_bitrate),
        };

        tables.validate()?;
        Ok(tables)
    }

    /// Cross-section consistency checks.
    pub fn validate(&self) -> CoreResult<()> {
        if self.codecs.is_empty() {
            return Err(CoreError::Config("codec catalogue is empty".to_string()));
        }

        for codec in self.codecs.codecs() {
            if codec.max_bit_depth != 8 && codec.max_bit_depth != 10 {
                return Err(CoreError::Config(format!(
                    "codec '{}' has unsupported max_bit_depth {}",
                    codec.encoder, codec.max_bit_depth
                )));
            }
        }

        for (ext, rules) in self.matrix.containers() {
            if !rules.supports_audio(&rules.default_audio_codec) {
                return Err(CoreError::Config(format!(
                    "container '{}': default audio codec '{}' is not in its audio list",
                    ext, rules.default_audio_codec
                )));
            }
            if self.matrix.audio_encoder(&rules.default_audio_codec).is_none() {
                return Err(CoreError::Config(format!(
                    "container '{}': no audio encoder entry for default codec '{}'",
                    ext, rules.default_audio_codec
                )));
            }
        }

        if self.fallback.max_dimension == 0 || self.fallback.fps <= 0.0 {
            return Err(CoreError::Config("fallback parameters must be positive".to_string()));
        }

        Ok(())
    }

    /// True when the source extension should use the vendor-neutral decode path.
    #[must_use]
    pub fn is_problematic_source(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.problematic_extensions.iter().any(|p| *p == ext)
            || self
                .matrix
                .container(&ext)
                .is_some_and(|rules| rules.hw_decode_hint == super::compatibility::HwDecodeHint::VendorNeutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_validate() {
        assert!(ConversionTables::default().validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_builtins() {
        let tables = ConversionTables::from_toml_str("").unwrap();
        assert_eq!(tables, ConversionTables::default());
    }

    #[test]
    fn test_profiles_section_replaces_ladder() {
        let toml = r#"
            [[profiles]]
            name = "Any"
            min_long_edge = 0
            fps_min = 0.0
            fps_max = 240.0
            average_bitrate = 1000000
        "#;
        let tables = ConversionTables::from_toml_str(toml).unwrap();
        assert_eq!(tables.ladder.profiles().len(), 1);
        assert_eq!(tables.ladder.profiles()[0].name, "Any");
        assert_eq!(tables.matrix, CompatibilityMatrix::builtin());
    }

    #[test]
    fn test_invalid_default_audio_codec_is_rejected() {
        let toml = r#"
            [containers.mp4]
            muxer = "mp4"
            video_codecs = ["h264"]
            audio_codecs = ["aac"]
            default_audio_codec = "opus"
        "#;
        let result = ConversionTables::from_toml_str(toml);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_unknown_section_is_a_parse_error() {
        let result = ConversionTables::from_toml_str("[bogus]\nx = 1\n");
        assert!(matches!(result, Err(CoreError::TablesParse(_))));
    }

    #[test]
    fn test_problematic_sources() {
        let tables = ConversionTables::default();
        assert!(tables.is_problematic_source("m2ts"));
        assert!(tables.is_problematic_source(".VOB"));
        assert!(!tables.is_problematic_source("mkv"));
    }
}
