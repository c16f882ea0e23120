//! Idle flusher
//!
//! Typing phrases and modifier-hold spans only close on the next event, which
//! may never come. This task probes the shared tracker on a fixed cadence and
//! lets the tracker close whatever has gone idle.

use crate::capture::clock::FrameClock;
use crate::capture::screenshot::{run_captures, DebugCapture};
use crate::processing::action::Action;
use crate::processing::tracker::ActionTracker;
use parking_lot::Mutex as ParkingMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct IdleFlusher {
    tracker: Arc<ParkingMutex<ActionTracker>>,
    clock: Arc<dyn FrameClock>,
    actions: UnboundedSender<Action>,
    cadence: Duration,
    debug_capture: Option<Arc<dyn DebugCapture>>,
}

impl IdleFlusher {
    pub fn new(
        tracker: Arc<ParkingMutex<ActionTracker>>,
        clock: Arc<dyn FrameClock>,
        actions: UnboundedSender<Action>,
        cadence: Duration,
    ) -> Self {
        Self {
            tracker,
            clock,
            actions,
            cadence,
            debug_capture: None,
        }
    }

    pub fn with_debug_capture(mut self, capture: Option<Arc<dyn DebugCapture>>) -> Self {
        self.debug_capture = capture;
        self
    }

    /// Run one probe; returns how many actions were closed
    pub fn probe(&self) -> usize {
        let now = self.clock.current_presentation_timestamp();
        let (count, marks) = {
            let mut tracker = self.tracker.lock();
            let completed = tracker.flush_idle(now);
            let count = completed.len();
            for action in completed {
                if self.actions.send(action).is_err() {
                    tracing::warn!("Action queue closed; dropping idle-flushed action");
                }
            }
            (count, tracker.take_marks())
        };
        run_captures(self.debug_capture.as_deref(), marks);
        count
    }

    /// Probe every `cadence` until `shutdown` flips to true or its sender is dropped
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!("Idle flusher started (cadence={:?})", self.cadence);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let closed = self.probe();
                        if closed > 0 {
                            tracing::debug!("Idle flusher closed {} action(s)", closed);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Idle flusher stopped");
        })
    }
}
