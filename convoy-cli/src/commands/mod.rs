//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command. The
//! helpers here turn the shared conversion arguments into core inputs.

pub mod plan;
pub mod run;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use convoy_core::config::{ConversionTables, CoreConfigBuilder};
use convoy_core::utils::extension_lowercase;
use convoy_core::{CoreError, find_processable_files};

use crate::cli::ConversionArgs;

/// Files to process and the directory they were found in.
#[derive(Debug)]
pub struct DiscoveredInputs {
    pub files: Vec<PathBuf>,
    pub input_dir: PathBuf,
}

/// Discovers media files from the input path (file or directory).
///
/// An input directory without matching files yields an empty list; a single
/// file must carry one of the accepted extensions.
pub fn discover_inputs(input: &Path, extensions: &[String]) -> anyhow::Result<DiscoveredInputs> {
    let input_path = input
        .canonicalize()
        .with_context(|| format!("Invalid input path '{}'", input.display()))?;
    let metadata = fs::metadata(&input_path)
        .with_context(|| format!("Failed to access input path '{}'", input_path.display()))?;

    if metadata.is_dir() {
        let files = match find_processable_files(&input_path, extensions) {
            Ok(files) => files,
            Err(CoreError::NoFilesFound) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(DiscoveredInputs {
            files,
            input_dir: input_path,
        })
    } else if metadata.is_file() {
        let accepted = extension_lowercase(&input_path)
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)));
        if !accepted {
            bail!(
                "Input file '{}' does not have a supported extension ({})",
                input_path.display(),
                extensions.join(", ")
            );
        }
        let input_dir = input_path
            .parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("Could not determine parent directory for file '{}'", input_path.display()))?;
        Ok(DiscoveredInputs {
            files: vec![input_path],
            input_dir,
        })
    } else {
        bail!("Input path '{}' is neither a file nor a directory", input_path.display())
    }
}

/// Applies the shared conversion arguments to a config builder.
pub fn apply_conversion_args(mut builder: CoreConfigBuilder, args: &ConversionArgs) -> CoreConfigBuilder {
    builder = builder
        .output_dir(args.output_dir.clone())
        .preserve_audio(!args.reencode_audio)
        .skip_existing(args.skip_existing)
        .hardware_decode(!args.no_hw_decode);
    if let Some(codec) = &args.video_codec {
        builder = builder.video_codec(codec);
    }
    if let Some(container) = &args.container {
        builder = builder.target_container(container);
    }
    if let Some(codec) = &args.audio_codec {
        builder = builder.audio_codec(codec);
    }
    if let Some(kbps) = args.audio_bitrate {
        builder = builder.audio_bitrate_kbps(kbps);
    }
    if let Some(modifier) = args.bitrate_modifier {
        builder = builder.bitrate_modifier(modifier);
    }
    if let Some(preset) = &args.preset {
        builder = builder.encoder_preset(preset);
    }
    if let Some(extensions) = &args.extensions {
        builder = builder.extensions(extensions.clone());
    }
    builder
}

/// Loads the conversion tables file, or the built-in tables.
pub fn load_tables(path: Option<&Path>) -> anyhow::Result<ConversionTables> {
    match path {
        Some(path) => ConversionTables::load(path)
            .with_context(|| format!("Failed to load conversion tables from '{}'", path.display())),
        None => Ok(ConversionTables::default()),
    }
}
