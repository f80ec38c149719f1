// ============================================================================
// convoy-cli/src/commands/run.rs
// ============================================================================
//
// RUN COMMAND: Full batch conversion
//
// Resolves the inputs, builds and validates the configuration, sets up the
// run log, then hands the batch to convoy-core and writes the JSON summary.
// Errors returned from here are setup errors; per-file failures live in the
// returned BatchSummary.

use std::fs;

use anyhow::Context;
use chrono::Local;
use convoy_core::config::{CoreConfig, CoreConfigBuilder, PreviewSettings};
use convoy_core::external::{FfprobeCli, SidecarSpawner, StdFsMetadataProvider, check_dependencies};
use convoy_core::reporting::{RunReport, write_run_report};
use convoy_core::{BatchSummary, process_batch};

use super::{apply_conversion_args, discover_inputs, load_tables};
use crate::cli::RunArgs;
use crate::logging::{get_timestamp, init_logging, run_log_path};
use crate::progress::TerminalProgress;
use crate::terminal;

/// Builds the core configuration for a run.
pub fn build_run_config(args: &RunArgs, input_dir: std::path::PathBuf) -> CoreConfig {
    let mut builder = apply_conversion_args(CoreConfigBuilder::new().input_dir(input_dir), &args.conversion);
    if let Some(log_dir) = &args.log_dir {
        builder = builder.log_dir(log_dir.clone());
    }
    if let Some(temp_dir) = &args.temp_dir {
        builder = builder.temp_dir(temp_dir.clone());
    }
    if args.preview {
        builder = builder.preview(PreviewSettings {
            clip_seconds: args.preview_seconds,
            start: args.preview_start,
            metric: args.preview_metric,
        });
    }
    builder.build()
}

/// Runs the conversion batch described by `args`.
pub fn run_batch(args: RunArgs, verbose: bool) -> anyhow::Result<BatchSummary> {
    let started_at = Local::now();

    let defaults = CoreConfig::default();
    let extensions = args.conversion.extensions.clone().unwrap_or(defaults.extensions);
    let inputs = discover_inputs(&args.conversion.input_path, &extensions)?;

    let config = build_run_config(&args, inputs.input_dir);
    let tables = load_tables(args.conversion.tables.as_deref())?;
    config.validate(&tables).context("Invalid configuration")?;

    // --- Create Output/Log Dirs ---
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory '{}'", config.output_dir.display()))?;
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory '{}'", config.log_dir.display()))?;

    let log_path = run_log_path(&config.log_dir, &get_timestamp());
    init_logging(&log_path, verbose).context("Failed to initialize logging")?;
    log::info!("Convoy run started: {}", started_at.format("%Y-%m-%d %H:%M:%S"));

    terminal::print_section("convoy");
    terminal::print_status("Input", &config.input_dir.display().to_string(), false);
    terminal::print_status("Output", &config.output_dir.display().to_string(), false);
    terminal::print_status("Run log", &log_path.display().to_string(), false);
    terminal::print_status("Video codec", &config.video_codec, true);
    if let Some(container) = &config.target_container {
        terminal::print_status("Container", container, false);
    }
    if let Some(preview) = &config.preview {
        terminal::print_status("Preview", preview.metric.name(), false);
    }

    if inputs.files.is_empty() {
        terminal::print_skipped("No processable files found");
        log::info!("No processable files found in {}", config.input_dir.display());
        return Ok(BatchSummary::default());
    }

    check_dependencies().context("ffmpeg and ffprobe must be installed and on PATH")?;

    let reporter = TerminalProgress::new();
    let summary = process_batch(
        &SidecarSpawner,
        &FfprobeCli::new(),
        &StdFsMetadataProvider,
        &config,
        &tables,
        &inputs.files,
        &reporter,
    )?;

    let report = RunReport::new(&summary, &config.input_dir, &config.output_dir, started_at);
    match write_run_report(&config.log_dir, &report) {
        Ok(path) => terminal::print_status("Summary file", &path.display().to_string(), false),
        Err(e) => log::warn!("Failed to write run summary: {e}"),
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use convoy_core::config::{PreviewStart, QualityMetric};
    use std::path::PathBuf;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["convoy", "run", "-i", "in", "-o", "/out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            Commands::Plan(_) => unreachable!(),
        }
    }

    #[test]
    fn test_log_dir_defaults_under_output() {
        let config = build_run_config(&run_args(&[]), PathBuf::from("/in"));
        assert_eq!(config.log_dir, PathBuf::from("/out/logs"));
        assert_eq!(config.input_dir, PathBuf::from("/in"));
        assert!(config.preview.is_none());
    }

    #[test]
    fn test_preview_settings_are_built() {
        let args = run_args(&["--preview", "--preview-seconds", "6", "--preview-start", "30", "--preview-metric", "psnr"]);
        let config = build_run_config(&args, PathBuf::from("/in"));
        let preview = config.preview.expect("preview settings");
        assert_eq!(preview.clip_seconds, 6.0);
        assert_eq!(preview.start, PreviewStart::Offset(30.0));
        assert_eq!(preview.metric, QualityMetric::Psnr);
    }

    #[test]
    fn test_explicit_dirs() {
        let args = run_args(&["-l", "/logs", "--temp-dir", "/scratch"]);
        let config = build_run_config(&args, PathBuf::from("/in"));
        assert_eq!(config.log_dir, PathBuf::from("/logs"));
        assert_eq!(config.work_root(), PathBuf::from("/scratch/convoy-work"));
    }
}
