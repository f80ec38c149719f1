// convoy-core/tests/test_tables_file.rs

mod common;

use common::{BatchDirs, create_dummy_file, has_pair, stub_hd_source};
use convoy_core::config::ConversionTables;
use convoy_core::error::CoreError;
use convoy_core::external::StdFsMetadataProvider;
use convoy_core::external::mocks::{MockFfmpegSpawner, MockMediaProber};
use convoy_core::processing::process_batch;
use convoy_core::progress::NullProgressReporter;
use std::fs;

const FLAT_LADDER: &str = r#"
# One tier for everything
[[profiles]]
name = "Flat"
min_long_edge = 0
fps_min = 0.0
fps_max = 240.0
average_bitrate = 3000000
"#;

#[test]
fn test_loaded_ladder_drives_the_encode() -> Result<(), Box<dyn std::error::Error>> {
    let dirs = BatchDirs::new();
    let tables_path = dirs.input.path().join("tables.toml");
    fs::write(&tables_path, FLAT_LADDER)?;
    let tables = ConversionTables::load(&tables_path)?;

    let source = create_dummy_file(dirs.input.path(), "movie.mkv");
    let prober = MockMediaProber::new();
    stub_hd_source(&prober, &source);

    let config = dirs.config().bitrate_modifier(0.5).build();
    config.validate(&tables)?;
    let spawner = MockFfmpegSpawner::succeeding();
    let summary = process_batch(
        &spawner,
        &prober,
        &StdFsMetadataProvider,
        &config,
        &tables,
        &[source],
        &NullProgressReporter,
    )?;

    assert_eq!(summary.results[0].profile.as_deref(), Some("Flat"));
    let encode = &spawner.get_received_calls()[1];
    assert!(has_pair(encode, "-b:v", "1500000"));
    assert!(has_pair(encode, "-maxrate", "2250000"));
    assert!(has_pair(encode, "-bufsize", "3000000"));
    Ok(())
}

#[test]
fn test_missing_tables_file_is_a_config_error() {
    let dirs = BatchDirs::new();
    let result = ConversionTables::load(&dirs.input.path().join("nope.toml"));
    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[test]
fn test_unknown_codec_fails_validation() {
    let dirs = BatchDirs::new();
    let config = dirs.config().video_codec("libfantasy").build();
    assert!(config.validate(&ConversionTables::default()).is_err());
}
