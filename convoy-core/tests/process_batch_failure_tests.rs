// convoy-core/tests/process_batch_failure_tests.rs

mod common;

use common::{BatchDirs, create_dummy_file, stub_hd_source};
use convoy_core::config::ConversionTables;
use convoy_core::error::CoreError;
use convoy_core::external::StdFsMetadataProvider;
use convoy_core::external::mocks::{MockFfmpegSpawner, MockMediaProber, log_event};
use convoy_core::processing::process_batch;
use convoy_core::progress::NullProgressReporter;
use convoy_core::{ExecutionStatus, FailureReason};
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress};

#[test]
fn test_encode_failure_discards_temp_output_and_batch_continues() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let broken = create_dummy_file(dirs.input.path(), "a_broken.mkv");
    let fine = create_dummy_file(dirs.input.path(), "b_fine.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &broken);
    stub_hd_source(&prober, &fine);

    let spawner = MockFfmpegSpawner::succeeding();
    let events = vec![
        FfmpegEvent::Progress(FfmpegProgress {
            frame: 50,
            fps: 30.0,
            q: 0.0,
            size_kb: 512,
            time: "00:00:01.66".to_string(),
            bitrate_kbps: 2457.6,
            speed: 1.0,
            raw_log_message: String::new(),
        }),
        log_event("[matroska @ 0x1] Invalid data found when processing input"),
        FfmpegEvent::Error("Conversion failed!".to_string()),
    ];
    // Pass 2 of the first file writes a partial output, then exits non-zero
    spawner.add_exit_error_expectation("a_broken.mp4.tmp", events, 1, true);

    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[broken, fine],
        &NullProgressReporter,
    )?;

    assert_eq!((summary.completed, summary.skipped, summary.failed), (1, 0, 1));
    let failed = &summary.results[0];
    assert_eq!(failed.status, ExecutionStatus::Failed);
    match &failed.failure {
        Some(FailureReason::EncodeFailed { exit_code, diagnostics }) => {
            assert_eq!(*exit_code, Some(1));
            assert!(diagnostics.contains("Invalid data found"));
            assert!(diagnostics.contains("ERROR: Conversion failed!"));
        }
        other => panic!("Expected EncodeFailed, got {other:?}"),
    }
    assert!(!dirs.out("a_broken.mp4.tmp").exists(), "Partial output must be removed");
    assert!(!dirs.out("a_broken.mp4").exists());

    assert_eq!(summary.results[1].status, ExecutionStatus::Completed);
    assert!(dirs.out("b_fine.mp4").exists());
    Ok(())
}

#[test]
fn test_analysis_failure_skips_second_phase() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let source = create_dummy_file(dirs.input.path(), "movie.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &source);

    let spawner = MockFfmpegSpawner::new();
    spawner.add_exit_error_expectation("pass=1", vec![], 187, false);

    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[source],
        &NullProgressReporter,
    )?;

    assert_eq!(summary.failed, 1);
    assert!(matches!(
        summary.results[0].failure,
        Some(FailureReason::EncodeFailed { exit_code: Some(187), .. })
    ));
    assert_eq!(spawner.get_received_calls().len(), 1);
    Ok(())
}

#[test]
fn test_spawn_error_is_reported_as_encode_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let source = create_dummy_file(dirs.input.path(), "movie.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &source);

    let spawner = MockFfmpegSpawner::new();
    spawner.add_spawn_error_expectation(
        "pass=1",
        CoreError::CommandStart(
            "ffmpeg".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg not found"),
        ),
    );

    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[source],
        &NullProgressReporter,
    )?;

    match &summary.results[0].failure {
        Some(FailureReason::EncodeFailed { exit_code: None, diagnostics }) => {
            assert!(diagnostics.contains("ffmpeg not found"));
        }
        other => panic!("Expected EncodeFailed without exit code, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_missing_temp_output_is_a_rename_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let source = create_dummy_file(dirs.input.path(), "movie.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &source);

    let spawner = MockFfmpegSpawner::succeeding();
    // Exits cleanly without writing anything
    spawner.add_success_expectation("movie.mp4.tmp", vec![], false);

    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[source],
        &NullProgressReporter,
    )?;

    assert_eq!(summary.failed, 1);
    assert!(matches!(
        summary.results[0].failure,
        Some(FailureReason::RenameFailed { .. })
    ));
    assert!(!dirs.out("movie.mp4").exists());
    Ok(())
}

#[test]
fn test_unreadable_source_is_probe_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let missing = dirs.input.path().join("vanished.mkv");
    let present = create_dummy_file(dirs.input.path(), "present.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &present);

    let spawner = MockFfmpegSpawner::succeeding();
    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[missing, present],
        &NullProgressReporter,
    )?;

    assert_eq!((summary.completed, summary.failed), (1, 1));
    assert!(matches!(
        summary.results[0].failure,
        Some(FailureReason::ProbeFailed { .. })
    ));
    Ok(())
}

#[test]
fn test_prober_errors_fall_back_to_default_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let source = create_dummy_file(dirs.input.path(), "odd.mkv");
    let prober = MockMediaProber::new();
    prober.fail_path(&source);

    let spawner = MockFfmpegSpawner::succeeding();
    let config = dirs.config().build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[source],
        &NullProgressReporter,
    )?;

    // Resolution unknown: the 1080p fallback tier is used, no source cap
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.results[0].profile.as_deref(), Some("1080p 30fps"));
    Ok(())
}

#[test]
fn test_incompatible_container_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let source = create_dummy_file(dirs.input.path(), "movie.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &source);

    let spawner = MockFfmpegSpawner::new();
    // hevc cannot go into webm
    let config = dirs.config().target_container("webm").build();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &ConversionTables::default(),
        &[source],
        &NullProgressReporter,
    )?;

    assert_eq!(summary.skipped, 1);
    assert!(!summary.has_failures());
    assert!(matches!(
        summary.results[0].failure,
        Some(FailureReason::PlanRejected { .. })
    ));
    assert!(spawner.get_received_calls().is_empty());
    Ok(())
}
