//! Scheduler trace events.
//!
//! An optional hook observes every scheduling decision. Hooks run on the
//! thread that made the decision, after the scheduler lock is released, so a
//! hook may call back into the scheduler's read-only API.

use std::sync::Arc;
use std::time::Duration;

use crate::task::TaskId;

/// One scheduling decision or lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TraceEvent {
    /// Task registered and queued READY.
    Created { id: TaskId, priority: u8 },
    /// Task took the RUNNING slot.
    Dispatched {
        id: TaskId,
        previous: Option<TaskId>,
        slice: Duration,
    },
    /// Outgoing RUNNING task went back to the tail of its level.
    Requeued { id: TaskId, priority: u8 },
    /// Tick found nothing READY and nothing RUNNING.
    Idle,
    /// Entry routine returned.
    Terminated { id: TaskId },
    /// Task was cancelled before activation.
    Cancelled { id: TaskId },
}

pub type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

/// Events collected under the scheduler lock, emitted once it is released.
#[derive(Default)]
pub(crate) struct PendingTrace {
    events: Vec<TraceEvent>,
}

impl PendingTrace {
    pub(crate) fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub(crate) fn emit(self, hook: Option<&TraceHook>) {
        if let Some(hook) = hook {
            for event in &self.events {
                hook(event);
            }
        }
    }
}
