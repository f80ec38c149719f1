//! Quality preview guardrail.
//!
//! Before a full-length encode, a short clip can be cut from the source by
//! stream copy, encoded with exactly the plan's video settings, and scored
//! against the original with ffmpeg's metric filters. The score is reported
//! and logged only; it never changes the plan or stops the encode, and any
//! failure along the way just means "no score".

use std::path::Path;

use crate::config::{PreviewSettings, PreviewStart, QualityMetric};
use crate::execution::EncodeWorkspace;
use crate::execution::command::{clip_extract_command, metric_command, preview_encode_command};
use crate::external::FfmpegSpawner;
use crate::external::ffmpeg_executor::run_to_completion;
use crate::planning::ConversionPlan;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

/// Start offset of the preview clip.
///
/// `Middle` is half the duration. When the clip would run past the end of a
/// file of known duration, the start backs off to `duration - clip` (not
/// below zero).
#[must_use]
pub fn preview_start_offset(start: PreviewStart, duration: f64, clip_seconds: f64) -> f64 {
    let offset = match start {
        PreviewStart::Offset(seconds) => seconds,
        PreviewStart::Middle => duration / 2.0,
    };
    if duration > 0.0 && offset + clip_seconds > duration {
        (duration - clip_seconds).max(0.0)
    } else {
        offset
    }
}

/// The lavfi filter computing `metric`.
#[must_use]
pub fn metric_filter(metric: QualityMetric) -> &'static str {
    match metric {
        QualityMetric::Vmaf => "libvmaf",
        QualityMetric::Ssim => "ssim",
        QualityMetric::Psnr => "psnr",
    }
}

/// Extracts the score from one line of metric filter output.
#[must_use]
pub fn parse_metric_score(metric: QualityMetric, line: &str) -> Option<f64> {
    let after = |marker: &str| -> Option<f64> {
        let (_, rest) = line.split_once(marker)?;
        rest.split_whitespace().next()?.parse::<f64>().ok()
    };
    match metric {
        QualityMetric::Vmaf => after("VMAF score:"),
        QualityMetric::Ssim if line.contains("SSIM") => after("All:"),
        QualityMetric::Psnr if line.contains("PSNR") => after("average:"),
        _ => None,
    }
}

/// Runs the preview for `plan`. Returns the score, or `None` on any failure.
pub fn run_quality_preview<S: FfmpegSpawner>(
    spawner: &S,
    plan: &ConversionPlan,
    settings: &PreviewSettings,
    work_root: &Path,
) -> Option<f64> {
    let workspace = match EncodeWorkspace::create(work_root) {
        Ok(workspace) => workspace,
        Err(e) => {
            log::warn!("Quality preview skipped, no workspace: {e}");
            return None;
        }
    };

    let start = preview_start_offset(settings.start, plan.duration_seconds, settings.clip_seconds);
    let reference = workspace.path().join("preview_reference.mkv");
    let encoded = workspace.path().join("preview_encoded.mkv");
    log::info!(
        "Quality preview for {}: {:.1}s clip at {:.1}s",
        plan.source_path.display(),
        settings.clip_seconds,
        start
    );

    run_step(
        spawner,
        clip_extract_command(&plan.source_path, start, settings.clip_seconds, &reference),
        &workspace,
        "clip extraction",
    )?;
    run_step(
        spawner,
        preview_encode_command(plan, &reference, &encoded),
        &workspace,
        "clip encode",
    )?;
    let lines = run_step(
        spawner,
        metric_command(&encoded, &reference, metric_filter(settings.metric)),
        &workspace,
        "metric",
    )?;

    let score = lines
        .iter()
        .rev()
        .find_map(|line| parse_metric_score(settings.metric, line));
    match score {
        Some(score) => log::info!(
            "Quality preview {} for {}: {:.3}",
            settings.metric.name(),
            plan.source_path.display(),
            score
        ),
        None => log::warn!(
            "Quality preview produced no {} score for {}",
            settings.metric.name(),
            plan.source_path.display()
        ),
    }
    score
}

/// Runs one preview command; returns its log lines on a zero exit status.
fn run_step<S: FfmpegSpawner>(
    spawner: &S,
    mut cmd: FfmpegCommand,
    workspace: &EncodeWorkspace,
    step: &str,
) -> Option<Vec<String>> {
    workspace.bind(&mut cmd);
    let mut lines = Vec::new();
    let result = run_to_completion(spawner, cmd, |event| {
        match event {
            FfmpegEvent::Log(_, line) => lines.push(line),
            FfmpegEvent::Error(line) => lines.push(line),
            _ => {}
        }
        Ok(())
    });
    match result {
        Ok(status) if status.success() => Some(lines),
        Ok(status) => {
            log::warn!("Quality preview {step} failed with {status}");
            None
        }
        Err(e) => {
            log::warn!("Quality preview {step} could not run: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_offsets() {
        assert_eq!(preview_start_offset(PreviewStart::Middle, 600.0, 10.0), 300.0);
        assert_eq!(preview_start_offset(PreviewStart::Offset(30.0), 600.0, 10.0), 30.0);
        // Backs off when the clip would overrun the end
        assert_eq!(preview_start_offset(PreviewStart::Offset(595.0), 600.0, 10.0), 590.0);
        assert_eq!(preview_start_offset(PreviewStart::Middle, 8.0, 10.0), 0.0);
        // Unknown duration leaves a numeric offset alone
        assert_eq!(preview_start_offset(PreviewStart::Offset(42.0), 0.0, 10.0), 42.0);
    }

    #[test]
    fn test_parse_vmaf_line() {
        let line = "[Parsed_libvmaf_0 @ 0x55d0c8a3c340] VMAF score: 94.871234";
        assert_eq!(parse_metric_score(QualityMetric::Vmaf, line), Some(94.871234));
    }

    #[test]
    fn test_parse_ssim_line() {
        let line = "[Parsed_ssim_0 @ 0x1] SSIM Y:0.991 (20.5) U:0.995 (23.0) V:0.994 (22.2) All:0.992513 (21.25)";
        assert_eq!(parse_metric_score(QualityMetric::Ssim, line), Some(0.992513));
    }

    #[test]
    fn test_parse_psnr_line() {
        let line = "[Parsed_psnr_0 @ 0x1] PSNR y:41.20 u:45.10 v:45.90 average:42.35 min:38.00 max:50.10";
        assert_eq!(parse_metric_score(QualityMetric::Psnr, line), Some(42.35));
    }

    #[test]
    fn test_unparsable_lines() {
        assert_eq!(parse_metric_score(QualityMetric::Vmaf, "frame=  100 fps=25"), None);
        assert_eq!(parse_metric_score(QualityMetric::Ssim, "All:0.9 without marker"), None);
        assert_eq!(parse_metric_score(QualityMetric::Vmaf, "VMAF score: n/a"), None);
    }
}
