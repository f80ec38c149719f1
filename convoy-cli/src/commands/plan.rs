// ============================================================================
// convoy-cli/src/commands/plan.rs
// ============================================================================
//
// PLAN COMMAND: Dry run
//
// Probes every input and prints the plan the run command would execute,
// without spawning ffmpeg or touching the output directory.

use anyhow::Context;
use convoy_core::config::{CoreConfig, CoreConfigBuilder};
use convoy_core::external::{FfprobeCli, StdFsMetadataProvider, check_dependency};
use convoy_core::planning::{ConversionPlan, EncoderStrategy};
use convoy_core::processing::PlanOutcome;
use convoy_core::utils::format_bitrate;
use convoy_core::{format_duration, plan_batch};
use serde_json::json;
use std::path::{Path, PathBuf};

use super::{apply_conversion_args, discover_inputs, load_tables};
use crate::cli::PlanArgs;
use crate::terminal;

/// Prints the plan for every input file.
pub fn run_plan(args: PlanArgs) -> anyhow::Result<()> {
    let defaults = CoreConfig::default();
    let extensions = args.conversion.extensions.clone().unwrap_or(defaults.extensions);
    let inputs = discover_inputs(&args.conversion.input_path, &extensions)?;

    let config = apply_conversion_args(CoreConfigBuilder::new().input_dir(inputs.input_dir), &args.conversion).build();
    let tables = load_tables(args.conversion.tables.as_deref())?;
    config.validate(&tables).context("Invalid configuration")?;

    if !inputs.files.is_empty() {
        check_dependency("ffprobe").context("ffprobe must be installed and on PATH")?;
    }

    let outcomes = plan_batch(&FfprobeCli::new(), &StdFsMetadataProvider, &config, &tables, &inputs.files);

    if args.json {
        let entries: Vec<serde_json::Value> = outcomes.iter().map(|(source, outcome)| outcome_json(source, outcome)).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    terminal::print_section("plan");
    if outcomes.is_empty() {
        terminal::print_skipped("No processable files found");
    }
    for (source, outcome) in &outcomes {
        terminal::print_processing(&display_name(source));
        match outcome {
            PlanOutcome::Planned(plan) => print_plan(plan),
            PlanOutcome::Rejected(rejection) => terminal::print_skipped(&rejection.to_string()),
            PlanOutcome::ProbeFailed(message) => terminal::print_error("Probe failed", message, None),
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn print_plan(plan: &ConversionPlan) {
    let strategy = match plan.strategy() {
        EncoderStrategy::TwoPhaseSoftware => "two-phase software encode",
        EncoderStrategy::SinglePhaseHardware => "single-phase hardware encode",
    };
    let audio = match plan.audio.bitrate_kbps {
        Some(kbps) => format!("{} {kbps}k", plan.audio.target),
        None => plan.audio.target.to_string(),
    };

    terminal::print_status("Output", &plan.output_path.display().to_string(), false);
    terminal::print_status("Profile", &plan.rate.profile_name, true);
    terminal::print_status(
        "Bitrate",
        &format!(
            "{} (max {}, buffer {}){}",
            format_bitrate(plan.rate.average_bitrate),
            format_bitrate(plan.rate.max_rate),
            format_bitrate(plan.rate.buffer_size),
            if plan.rate.source_cap_applied { ", capped to source" } else { "" }
        ),
        false,
    );
    terminal::print_status("Encoder", &format!("{} ({})", plan.video_codec, strategy), false);
    terminal::print_status("Pixel format", &plan.pixel_format, false);
    terminal::print_status("Decode", &plan.hw_accel.to_string(), false);
    terminal::print_status("Audio", &audio, false);
    terminal::print_status("Duration", &format_duration(plan.duration_seconds), false);
    if plan.hdr_carry_through() {
        terminal::print_sub_item("HDR colour metadata carried through");
    }
}

fn outcome_json(source: &Path, outcome: &PlanOutcome) -> serde_json::Value {
    let source: PathBuf = source.to_path_buf();
    match outcome {
        PlanOutcome::Planned(plan) => json!({ "source": source, "status": "planned", "plan": plan }),
        PlanOutcome::Rejected(rejection) => {
            json!({ "source": source, "status": "skipped", "reason": rejection.to_string() })
        }
        PlanOutcome::ProbeFailed(message) => json!({ "source": source, "status": "probe_failed", "reason": message }),
    }
}
