//! Debug capture collaborators
//!
//! Engaged only when `debugCapture` is on. The tracker queues a start mark when
//! a span opens and an end mark when it closes; the session drains them after
//! releasing the tracker lock and hands each one to a [`DebugCapture`]. Files
//! are named `{index}_{phase}_{ms}.png`, where `index` is the 1-based span
//! number and `ms` the presentation time of the transition.

use crate::recorder::channel::{RecordingError, RecordingResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Start,
    End,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePhase::Start => write!(f, "start"),
            CapturePhase::End => write!(f, "end"),
        }
    }
}

/// One span transition worth a screenshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureMark {
    pub index: usize,
    pub phase: CapturePhase,
    /// Presentation timestamp of the transition, in seconds
    pub timestamp: f64,
}

pub trait DebugCapture: Send + Sync {
    fn capture(&self, mark: &CaptureMark);
}

/// Hand every mark to `capture`, if one is engaged
pub fn run_captures(capture: Option<&dyn DebugCapture>, marks: Vec<CaptureMark>) {
    if let Some(capture) = capture {
        for mark in &marks {
            capture.capture(mark);
        }
    }
}

pub fn screenshot_file_name(mark: &CaptureMark) -> String {
    let ms = (mark.timestamp * 1000.0).round().max(0.0) as u64;
    format!("{}_{}_{}.png", mark.index, mark.phase, ms)
}

/// Runs an external screenshot tool (e.g. `screencapture -x`) with the output path appended
pub struct ScreenshotCommand {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
}

impl ScreenshotCommand {
    pub fn new(command: &[String], dir: &Path) -> RecordingResult<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            RecordingError::ConfigurationError("Screenshot command is empty".to_string())
        })?;
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            dir: dir.to_path_buf(),
        })
    }

    pub fn output_path(&self, mark: &CaptureMark) -> PathBuf {
        self.dir.join(screenshot_file_name(mark))
    }
}

impl DebugCapture for ScreenshotCommand {
    fn capture(&self, mark: &CaptureMark) {
        let path = self.output_path(mark);
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap off the event path so input hooks never wait on the tool
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => tracing::warn!("Failed to run {}: {}", self.program, e),
        }
    }
}
