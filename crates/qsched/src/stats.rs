//! Aggregate and per-task snapshots.
//!
//! Every snapshot is copied out under the scheduler lock, so a reader never
//! sees a half-applied dispatch (for example a task that is both RUNNING and
//! queued).

use std::time::Duration;

use crate::task::{TaskId, TaskState};

/// Scheduler-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchedulerStats {
    /// Ticks in which the RUNNING task changed.
    pub context_switches: u64,
    /// CPU time charged to all tasks so far.
    pub total_cpu_time: Duration,
    /// Time during which nothing was READY or RUNNING.
    pub idle_time: Duration,
    /// Current dispatch quantum.
    pub quantum: Duration,
    /// Dispatch steps taken.
    pub ticks: u64,
    /// Registered tasks that have not terminated.
    pub active_tasks: usize,
    /// Registry occupancy, terminated tasks included until reaped.
    pub registered_tasks: usize,
    /// Tasks currently queued READY.
    pub ready_tasks: usize,
    pub running: Option<TaskId>,
}

/// Point-in-time view of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub priority: u8,
    pub nice: i8,
    pub affinity: Option<usize>,
    pub dispatch_count: u64,
    pub cpu_time: Duration,
    pub time_slice: Duration,
    /// Creation time on the scheduler clock.
    pub created_at: Duration,
}
