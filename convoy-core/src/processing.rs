// ============================================================================
// convoy-core/src/processing.rs
// ============================================================================
//
// BATCH PROCESSING: Sequential orchestration of a whole batch
//
// Files are handled strictly one after another: probe, plan, optional quality
// preview, execute. Every per-file error is turned into a result for that
// file and the loop moves on; only setup errors (recovery, log directory)
// abort the batch. Counters are the only state shared across files.
//
// KEY COMPONENTS:
// - process_batch: Full run, returns a BatchSummary
// - plan_batch: Dry run that probes and plans without encoding

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{ConversionTables, CoreConfig};
use crate::error::CoreResult;
use crate::execution::{ExecutionEngine, ExecutionState, recover_interrupted_run};
use crate::external::{FfmpegSpawner, FileMetadataProvider, MediaProber};
use crate::media::build_descriptor;
use crate::planning::{BatchNames, ConversionPlan, PlanRejection, compile_plan};
use crate::preview::run_quality_preview;
use crate::progress::ProgressReporter;
use crate::{BatchSummary, ExecutionResult, ExecutionStatus, FailureReason};

/// Outcome of planning one file in a dry run.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Planned(Box<ConversionPlan>),
    Rejected(PlanRejection),
    ProbeFailed(String),
}

/// Probes and plans every file without running any encode.
pub fn plan_batch<P, M>(
    prober: &P,
    metadata: &M,
    config: &CoreConfig,
    tables: &ConversionTables,
    files: &[PathBuf],
) -> Vec<(PathBuf, PlanOutcome)>
where
    P: MediaProber,
    M: FileMetadataProvider,
{
    let names = BatchNames::new(files);
    files
        .iter()
        .map(|file| {
            let outcome = match build_descriptor(prober, metadata, file, tables.assumed_audio_bitrate) {
                Err(e) => PlanOutcome::ProbeFailed(e.to_string()),
                Ok(descriptor) => match compile_plan(&descriptor, config, tables, &names) {
                    Ok(plan) => PlanOutcome::Planned(Box::new(plan)),
                    Err(rejection) => PlanOutcome::Rejected(rejection),
                },
            };
            (file.clone(), outcome)
        })
        .collect()
}

/// Processes every file of the batch in order.
///
/// Returns `Err` only when the run cannot start; per-file problems are
/// recorded in the summary.
pub fn process_batch<S, P, M>(
    spawner: &S,
    prober: &P,
    metadata: &M,
    config: &CoreConfig,
    tables: &ConversionTables,
    files: &[PathBuf],
    reporter: &dyn ProgressReporter,
) -> CoreResult<BatchSummary>
where
    S: FfmpegSpawner,
    P: MediaProber,
    M: FileMetadataProvider,
{
    let batch_start = Instant::now();

    // ========================================================================
    // STEP 1: RECOVER FROM AN INTERRUPTED RUN
    // ========================================================================

    std::fs::create_dir_all(&config.output_dir)?;
    let work_root = config.work_root();
    recover_interrupted_run(&config.output_dir, &work_root, &tables.matrix)?;

    // ========================================================================
    // STEP 2: PROCESS EACH FILE
    // ========================================================================

    let names = BatchNames::new(files);
    let engine = ExecutionEngine::new(spawner, work_root.clone(), reporter);
    let mut summary = BatchSummary::default();
    reporter.batch_started(files.len());

    for (index, source) in files.iter().enumerate() {
        reporter.file_started(index, files.len(), source);
        let result = process_file(
            &engine, spawner, prober, metadata, config, tables, &names, &work_root, reporter, source,
        );
        match (&result.status, &result.failure) {
            (ExecutionStatus::Completed, _) => log::info!(
                "Completed {} -> {}",
                source.display(),
                result.output.as_deref().map_or_else(String::new, |p| p.display().to_string())
            ),
            (_, Some(reason)) => log::warn!("{}: {}", source.display(), reason),
            (_, None) => {}
        }
        reporter.file_finished(&result);
        summary.record(result);
    }

    // Workspaces are removed as they finish; the root itself can go too.
    if let Err(e) = std::fs::remove_dir(&work_root) {
        log::debug!("Leaving work root {}: {}", work_root.display(), e);
    }

    summary.total_elapsed = batch_start.elapsed();
    reporter.batch_finished(&summary);
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn process_file<S, P, M>(
    engine: &ExecutionEngine<'_, S>,
    spawner: &S,
    prober: &P,
    metadata: &M,
    config: &CoreConfig,
    tables: &ConversionTables,
    names: &BatchNames,
    work_root: &Path,
    reporter: &dyn ProgressReporter,
    source: &Path,
) -> ExecutionResult
where
    S: FfmpegSpawner,
    P: MediaProber,
    M: FileMetadataProvider,
{
    let started = Instant::now();

    let descriptor = match build_descriptor(prober, metadata, source, tables.assumed_audio_bitrate) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            return ExecutionResult::not_completed(
                source.to_path_buf(),
                ExecutionStatus::Failed,
                FailureReason::ProbeFailed { message: e.to_string() },
                started.elapsed(),
            );
        }
    };

    let plan = match compile_plan(&descriptor, config, tables, names) {
        Ok(plan) => plan,
        Err(rejection) => {
            reporter.state_changed(source, ExecutionState::Skipped);
            let mut result = ExecutionResult::not_completed(
                source.to_path_buf(),
                ExecutionStatus::Skipped,
                FailureReason::PlanRejected {
                    reason: rejection.to_string(),
                },
                started.elapsed(),
            );
            result.input_size = descriptor.file_size;
            return result;
        }
    };

    log::info!("{}: {}", source.display(), plan.summary());

    let preview_score = config
        .preview
        .as_ref()
        .and_then(|settings| run_quality_preview(spawner, &plan, settings, work_root));

    let outcome = engine.execute(&plan);

    let mut result = ExecutionResult {
        source: source.to_path_buf(),
        output: None,
        status: ExecutionStatus::Failed,
        failure: None,
        input_size: descriptor.file_size,
        output_size: None,
        profile: Some(plan.rate.profile_name.clone()),
        preview_score,
        elapsed: Duration::ZERO,
    };

    match outcome {
        Ok(()) => {
            // Give the filesystem a moment before trusting the new file's size.
            std::thread::sleep(config.size_settle_delay);
            result.output_size = metadata.get_size(&plan.output_path).ok();
            result.output = Some(plan.output_path.clone());
            result.status = ExecutionStatus::Completed;
        }
        Err(reason) => {
            result.failure = Some(reason);
        }
    }
    result.elapsed = started.elapsed();
    result
}
