//! Timeline sinks
//!
//! Completed actions leave the tracker through an unbounded queue and are
//! serialized here, outside the tracker lock. A sink that fails to accept an
//! action gets the same action again later; tracker state is never touched.
//! A writer that cannot finish at shutdown is handed back inside
//! [`UnfinishedTimeline`] so the caller can retry once the problem is fixed.

use crate::processing::action::Action;
use crate::recorder::channel::{RecordingError, RecordingResult};
use parking_lot::Mutex as ParkingMutex;
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use thiserror::Error;

/// Receives completed actions in completion order
pub trait TimelineSink: Send + Sync {
    /// Called exactly once per completed action that it accepts
    fn accept(&mut self, action: &Action) -> RecordingResult<()>;

    /// Called when the session ends, and again after a failed attempt
    fn finish(&mut self) -> RecordingResult<()> {
        Ok(())
    }
}

/// Collects the whole timeline and writes it as a pretty JSON array on finish
pub struct JsonTimelineFile {
    path: PathBuf,
    actions: Vec<Action>,
}

impl JsonTimelineFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            actions: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl TimelineSink for JsonTimelineFile {
    fn accept(&mut self, action: &Action) -> RecordingResult<()> {
        self.actions.push(action.clone());
        Ok(())
    }

    fn finish(&mut self) -> RecordingResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.actions)?;
        std::fs::write(&self.path, data)?;
        tracing::info!(
            "Wrote {} actions to {}",
            self.actions.len(),
            self.path.display()
        );
        for action in &self.actions {
            tracing::info!("  {}", action);
        }
        Ok(())
    }
}

/// Appends one JSON object per line as actions complete
pub struct JsonLinesTimeline {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesTimeline {
    pub fn create(path: impl Into<PathBuf>) -> RecordingResult<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TimelineSink for JsonLinesTimeline {
    fn accept(&mut self, action: &Action) -> RecordingResult<()> {
        let line = serde_json::to_string(action)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> RecordingResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink; clones share the same buffer
#[derive(Clone, Default)]
pub struct MemoryTimeline {
    actions: Arc<ParkingMutex<Vec<Action>>>,
}

impl MemoryTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }
}

impl TimelineSink for MemoryTimeline {
    fn accept(&mut self, action: &Action) -> RecordingResult<()> {
        self.actions.lock().push(action.clone());
        Ok(())
    }
}

/// Consumer side of the action queue; owns the sink for the whole session
pub struct TimelineWriter {
    sink: Box<dyn TimelineSink>,
    pending: VecDeque<Action>,
    accepted: usize,
}

impl fmt::Debug for TimelineWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineWriter")
            .field("pending", &self.pending.len())
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl TimelineWriter {
    pub fn new(sink: Box<dyn TimelineSink>) -> Self {
        Self {
            sink,
            pending: VecDeque::new(),
            accepted: 0,
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue an action and present everything pending to the sink, oldest first.
    /// Stops at the first failure and keeps the failed action at the head.
    pub fn push(&mut self, action: Action) -> RecordingResult<()> {
        self.pending.push_back(action);
        self.drain_pending()
    }

    fn drain_pending(&mut self) -> RecordingResult<()> {
        while let Some(action) = self.pending.front() {
            self.sink.accept(action)?;
            self.accepted += 1;
            self.pending.pop_front();
        }
        Ok(())
    }

    fn push_logged(&mut self, action: Action) {
        if let Err(e) = self.push(action) {
            tracing::warn!(
                "Timeline sink rejected action ({} pending, will retry): {}",
                self.pending.len(),
                e
            );
        }
    }

    /// Drain the queue until `shutdown` flips (or every sender is dropped), then
    /// finish the sink. Actions already queued at shutdown are still written.
    pub async fn run(
        mut self,
        mut rx: UnboundedReceiver<Action>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Box<dyn TimelineSink>, UnfinishedTimeline> {
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(action) => self.push_logged(action),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        while let Ok(action) = rx.try_recv() {
                            self.push_logged(action);
                        }
                        break;
                    }
                }
            }
        }
        self.finish()
    }

    /// Retry pending actions once more and finish the sink. On failure the
    /// writer comes back intact, pending actions and sink buffer included.
    pub fn finish(mut self) -> Result<Box<dyn TimelineSink>, UnfinishedTimeline> {
        if let Err(error) = self.drain_pending() {
            tracing::warn!(
                "{} action(s) still rejected at shutdown: {}",
                self.pending.len(),
                error
            );
            return Err(UnfinishedTimeline {
                error,
                writer: self,
            });
        }
        if let Err(error) = self.sink.finish() {
            tracing::warn!("Timeline sink failed to finish: {}", error);
            return Err(UnfinishedTimeline {
                error,
                writer: self,
            });
        }
        tracing::info!("Timeline writer finished ({} actions)", self.accepted);
        Ok(self.sink)
    }
}

/// A timeline whose shutdown failed. Nothing handed to the writer has been
/// dropped; [`UnfinishedTimeline::retry`] presents the pending actions again
/// and finishes the sink once more.
#[derive(Debug, Error)]
#[error("Timeline could not be finished: {error}")]
pub struct UnfinishedTimeline {
    #[source]
    error: RecordingError,
    writer: TimelineWriter,
}

impl UnfinishedTimeline {
    pub fn error(&self) -> &RecordingError {
        &self.error
    }

    /// Actions the sink has not accepted yet
    pub fn pending(&self) -> usize {
        self.writer.pending()
    }

    pub fn retry(self) -> Result<Box<dyn TimelineSink>, UnfinishedTimeline> {
        tracing::info!("Retrying unfinished timeline ({} pending)", self.pending());
        self.writer.finish()
    }
}

impl From<UnfinishedTimeline> for RecordingError {
    fn from(unfinished: UnfinishedTimeline) -> Self {
        RecordingError::TimelineUnfinished(Box::new(unfinished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::action::ActionKind;

    fn action(description: &str, start: f64) -> Action {
        Action {
            kind: ActionKind::Typing,
            description: description.to_string(),
            start,
            end: start,
        }
    }

    /// Fails the first `failures` calls to accept
    struct FlakySink {
        failures: usize,
        seen: MemoryTimeline,
    }

    impl TimelineSink for FlakySink {
        fn accept(&mut self, action: &Action) -> RecordingResult<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(RecordingError::SinkError("disk full".to_string()));
            }
            self.seen.accept(action)
        }
    }

    #[test]
    fn test_failed_action_is_retried_in_order() {
        let seen = MemoryTimeline::new();
        let mut writer = TimelineWriter::new(Box::new(FlakySink {
            failures: 1,
            seen: seen.clone(),
        }));

        assert!(writer.push(action("first", 1.0)).is_err());
        assert_eq!(writer.pending(), 1);
        assert!(seen.is_empty());

        writer.push(action("second", 2.0)).unwrap();
        assert_eq!(writer.pending(), 0);
        let descriptions: Vec<_> = seen.actions().into_iter().map(|a| a.description).collect();
        assert_eq!(descriptions, vec!["first", "second"]);
    }

    #[test]
    fn test_finish_surfaces_persistent_failure() {
        let mut writer = TimelineWriter::new(Box::new(FlakySink {
            failures: usize::MAX,
            seen: MemoryTimeline::new(),
        }));
        assert!(writer.push(action("stuck", 1.0)).is_err());

        let unfinished = writer.finish().err().unwrap();
        assert!(matches!(unfinished.error(), RecordingError::SinkError(_)));
        assert_eq!(unfinished.pending(), 1);
        let unfinished = unfinished.retry().err().unwrap();
        assert_eq!(unfinished.pending(), 1);
    }

    #[test]
    fn test_failed_finish_keeps_timeline_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let path = blocker.join("recording.json");

        let mut writer = TimelineWriter::new(Box::new(JsonTimelineFile::new(&path)));
        writer.push(action("saved", 1.0)).unwrap();
        let unfinished = writer.finish().err().unwrap();
        assert!(matches!(unfinished.error(), RecordingError::IoError(_)));
        assert_eq!(unfinished.pending(), 0);

        std::fs::remove_file(&blocker).unwrap();
        unfinished.retry().unwrap();

        let written: Vec<Action> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vec![action("saved", 1.0)]);
    }

    #[test]
    fn test_json_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recording.json");
        let mut sink = JsonTimelineFile::new(&path);
        sink.accept(&action("hi", 0.5)).unwrap();
        sink.finish().unwrap();

        let written: Vec<Action> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vec![action("hi", 0.5)]);
    }

    #[test]
    fn test_json_lines_appends_per_action() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");
        let mut sink = JsonLinesTimeline::create(&path).unwrap();
        sink.accept(&action("a", 1.0)).unwrap();
        sink.accept(&action("b", 2.0)).unwrap();

        // Lines are on disk before finish
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Action = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.description, "b");
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_closed() {
        let memory = MemoryTimeline::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle =
            tokio::spawn(TimelineWriter::new(Box::new(memory.clone())).run(rx, shutdown_rx));

        tx.send(action("one", 1.0)).unwrap();
        tx.send(action("two", 2.0)).unwrap();
        drop(tx);

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_actions() {
        let memory = MemoryTimeline::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Queue before the writer ever runs; the sender stays alive
        tx.send(action("queued", 1.0)).unwrap();
        shutdown_tx.send(true).unwrap();

        let writer = TimelineWriter::new(Box::new(memory.clone()));
        assert!(writer.run(rx, shutdown_rx).await.is_ok());
        assert_eq!(memory.len(), 1);
        drop(tx);
    }
}
