// ============================================================================
// convoy-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and run-log dispatch
//
// Every run writes a full debug log to `<log_dir>/convoy_run_<timestamp>.log`.
// The console only shows warnings and errors unless `--verbose` is given;
// regular progress is printed by the terminal module instead.
//
// ffmpeg's own output is logged under the `ffmpeg_log` target and is kept
// out of the console unless verbose.

use console::style;
use log::{Level, LevelFilter};
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Path of the run log for a run started at `timestamp`.
#[must_use]
pub fn run_log_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("convoy_run_{timestamp}.log"))
}

fn console_level(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::Debug } else { LevelFilter::Warn }
}

/// Installs the global logger: console on stderr plus the run log file.
pub fn init_logging(log_file: &Path, verbose: bool) -> Result<(), fern::InitError> {
    let console = fern::Dispatch::new()
        .level(console_level(verbose))
        .level_for("ffmpeg_log", if verbose { LevelFilter::Debug } else { LevelFilter::Off })
        .format(|out, message, record| {
            let level = match record.level() {
                Level::Error => style("ERROR").red().bold(),
                Level::Warn => style("WARN ").yellow(),
                Level::Info => style("INFO ").green(),
                Level::Debug => style("DEBUG").blue(),
                Level::Trace => style("TRACE").magenta(),
            };
            out.finish(format_args!("{level} {message}"))
        })
        .chain(std::io::stderr());

    let file = fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(fern::log_file(log_file)?);

    fern::Dispatch::new().chain(console).chain(file).apply()?;
    log::debug!("Logging to {}", log_file.display());
    Ok(())
}
