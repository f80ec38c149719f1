// ============================================================================
// convoy-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the convoy-core library
//
// This module defines the error type shared by every component of the engine,
// plus a few constructors for the external-process failures that come up in
// several places (ffmpeg, ffprobe).
//
// KEY COMPONENTS:
// - CoreError: The error enum returned by fallible library operations
// - CoreResult: Result alias used throughout the crate
// - command_*_error: Helpers for external command failures

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors produced by the convoy-core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, io::Error),

    #[error("Command '{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Probe failed for {path}: {message}")]
    ProbeFailed { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse conversion tables: {0}")]
    TablesParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No processable media files found")]
    NoFilesFound,
}

/// Result type used throughout convoy-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for a command that could not be spawned.
pub fn command_start_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(command.into(), err)
}

/// Builds a [`CoreError::CommandWait`] for a command whose exit could not be collected.
pub fn command_wait_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(command.into(), err)
}

/// Builds a [`CoreError::CommandFailed`] for a command that exited unsuccessfully.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        stderr: stderr.into(),
    }
}
