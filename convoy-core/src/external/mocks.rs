// convoy-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// This module is only compiled when the "test-mocks" feature is enabled.

use super::ffprobe_executor::{FieldSelector, MediaProber, StreamScope};
use super::{FfmpegProcess, FfmpegSpawner};
use crate::error::{CoreError, CoreResult};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
}

impl MockFfmpegProcess {
    fn new(events: Vec<FfmpegEvent>, exit_code: i32) -> Self {
        Self {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status: ExitStatus::from_raw(exit_code << 8),
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let events = self.events_to_emit.borrow().clone();
        for event in events {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
    pub create_dummy_output: bool,
}

/// A command the mock spawner received.
#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Expectations are consumed in insertion order by the first one whose pattern
/// appears in any argument. When nothing matches, a spawner created with
/// [`MockFfmpegSpawner::succeeding`] treats the call as a successful run and
/// writes a dummy output; a plain spawner panics.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<ReceivedCall>>>,
    succeed_by_default: bool,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spawner for which every unmatched command succeeds.
    pub fn succeeding() -> Self {
        Self {
            succeed_by_default: true,
            ..Self::default()
        }
    }

    pub fn add_expectation(&self, arg_pattern: &str, result: CoreResult<MockFfmpegProcess>, create_dummy_output: bool) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result,
            create_dummy_output,
        });
    }

    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, create_dummy_output: bool) {
        self.add_expectation(arg_pattern, Ok(MockFfmpegProcess::new(events, 0)), create_dummy_output);
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error), false);
    }

    /// Expects a command that runs but exits with `exit_code`, optionally after
    /// writing a partial output.
    pub fn add_exit_error_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        exit_code: i32,
        create_partial_output: bool,
    ) {
        self.add_expectation(
            arg_pattern,
            Ok(MockFfmpegProcess::new(events, exit_code)),
            create_partial_output,
        );
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().iter().map(|c| c.args.clone()).collect()
    }

    pub fn received(&self) -> Vec<ReceivedCall> {
        self.received_calls.borrow().clone()
    }

    fn create_dummy_output(args: &[String]) {
        let Some(output_path_str) = args.last() else {
            log::warn!("MockFfmpegSpawner couldn't find output path in args to create dummy file.");
            return;
        };
        if output_path_str == "-" {
            return;
        }
        let output_path = PathBuf::from(output_path_str);
        if let Some(parent) = output_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("MockFfmpegSpawner failed to create parent dir {:?}: {}", parent, e);
            }
        }
        match std::fs::write(&output_path, vec![0u8; 4096]) {
            Ok(()) => log::debug!("MockFfmpegSpawner created dummy output file: {:?}", output_path),
            Err(e) => log::error!("MockFfmpegSpawner failed to create dummy output file {:?}: {}", output_path, e),
        }
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let inner = cmd.as_inner_mut();
        let args: Vec<String> = inner.get_args().map(|s| s.to_string_lossy().into_owned()).collect();
        let current_dir = inner.get_current_dir().map(Path::to_path_buf);
        self.received_calls.borrow_mut().push(ReceivedCall {
            args: args.clone(),
            current_dir,
        });

        let mut expectations = self.expectations.borrow_mut();
        let found_index = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)));

        if let Some(index) = found_index {
            let expectation = expectations.remove(index);
            log::debug!("MockFfmpegSpawner: Matched expectation with pattern '{}'", expectation.arg_pattern);

            match expectation.result {
                Ok(process) => {
                    if expectation.create_dummy_output {
                        Self::create_dummy_output(&args);
                    }
                    Ok(process)
                }
                Err(err) => {
                    log::debug!("MockFfmpegSpawner simulating spawn error for pattern '{}'", expectation.arg_pattern);
                    Err(err)
                }
            }
        } else if self.succeed_by_default {
            Self::create_dummy_output(&args);
            Ok(MockFfmpegProcess::new(Vec::new(), 0))
        } else {
            panic!("MockFfmpegSpawner: No expectation found for command args: {:?}", args);
        }
    }
}

/// Log event helper for scripting ffmpeg output in tests.
pub fn log_event(line: &str) -> FfmpegEvent {
    FfmpegEvent::Log(LogLevel::Info, line.to_string())
}

/// Scripted audio stream for [`MockMediaProber::stub_audio`].
#[derive(Debug, Clone)]
pub struct MockAudioStream {
    pub codec: &'static str,
    pub bit_rate: &'static str,
    pub channels: &'static str,
    pub sample_rate: &'static str,
}

/// Mock implementation of [`MediaProber`].
///
/// Unscripted fields answer with no values, as ffprobe does for missing
/// entries. Paths registered with [`MockMediaProber::fail_path`] answer every
/// query with an error.
#[derive(Clone, Default)]
pub struct MockMediaProber {
    responses: Rc<RefCell<HashMap<(PathBuf, FieldSelector), Vec<String>>>>,
    failing: Rc<RefCell<HashSet<PathBuf>>>,
}

impl MockMediaProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &Path, selector: FieldSelector, values: &[&str]) {
        self.responses.borrow_mut().insert(
            (path.to_path_buf(), selector),
            values.iter().map(|v| (*v).to_string()).collect(),
        );
    }

    pub fn fail_path(&self, path: &Path) {
        self.failing.borrow_mut().insert(path.to_path_buf());
    }

    /// Scripts the common first-video-stream fields.
    pub fn stub_video(&self, path: &Path, width: &str, height: &str, frame_rate: &str, codec: &str, pix_fmt: &str) {
        self.set(path, FieldSelector::video("width"), &[width]);
        self.set(path, FieldSelector::video("height"), &[height]);
        self.set(path, FieldSelector::video("r_frame_rate"), &[frame_rate]);
        self.set(path, FieldSelector::video("codec_name"), &[codec]);
        self.set(path, FieldSelector::video("pix_fmt"), &[pix_fmt]);
    }

    /// Scripts container duration and bitrate.
    pub fn stub_format(&self, path: &Path, duration: &str, bit_rate: &str) {
        self.set(path, FieldSelector::format("duration"), &[duration]);
        self.set(path, FieldSelector::format("bit_rate"), &[bit_rate]);
    }

    /// Scripts the audio streams, one entry per stream.
    pub fn stub_audio(&self, path: &Path, streams: &[MockAudioStream]) {
        let column = |f: fn(&MockAudioStream) -> &'static str| -> Vec<&str> { streams.iter().map(f).collect() };
        self.set(path, FieldSelector::audio("codec_name"), &column(|s| s.codec));
        self.set(path, FieldSelector::audio("bit_rate"), &column(|s| s.bit_rate));
        self.set(path, FieldSelector::audio("channels"), &column(|s| s.channels));
        self.set(path, FieldSelector::audio("sample_rate"), &column(|s| s.sample_rate));
    }
}

impl MediaProber for MockMediaProber {
    fn query(&self, path: &Path, selector: FieldSelector) -> CoreResult<Vec<String>> {
        if self.failing.borrow().contains(path) {
            return Err(CoreError::ProbeFailed {
                path: path.display().to_string(),
                message: format!("mock failure for {:?} {}", selector.scope, selector.field),
            });
        }
        let values = self
            .responses
            .borrow()
            .get(&(path.to_path_buf(), selector))
            .cloned()
            .unwrap_or_default();
        if values.is_empty() && selector.scope != StreamScope::AllAudio {
            log::trace!("MockMediaProber: no value for {} on {}", selector.field, path.display());
        }
        Ok(values)
    }
}
