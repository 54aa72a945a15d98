//! Task records and the task state machine.
//!
//! ```text
//! NEW -> READY -> RUNNING -> READY (requeued at the tail of its level)
//!                 RUNNING -> TERMINATED
//! READY (never activated) -> TERMINATED   via cancel
//! ```
//!
//! `Blocked` and `Sleeping` are part of the state taxonomy but no transition
//! reaches them: a task that blocks inside its entry routine stalls its own
//! thread without the scheduler knowing.

use core::fmt;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::activation::Activation;

/// Longest task name, in characters. Longer names are truncated.
pub const MAX_NAME_LEN: usize = 63;

/// Monotonic task identifier. Never reused within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TaskId(pub u64);

impl TaskId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Task execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TaskState {
    /// Registered, not yet queued.
    New,
    /// Waiting in the ready queue of its priority level.
    Ready,
    /// Holds the scheduler's single RUNNING slot.
    Running,
    /// Declared; unreachable.
    Blocked,
    /// Declared; unreachable.
    Sleeping,
    /// Entry routine returned or the task was cancelled. Absorbing.
    Terminated,
}

impl TaskState {
    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

/// Entry routine of a task. The routine owns its argument.
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Resolves a caller-supplied name: rejects empty names and names with
/// interior NUL bytes, truncates to [`MAX_NAME_LEN`] characters. The flag is
/// set when the name was truncated.
pub(crate) fn normalize_name(name: &str) -> Result<(String, bool), &'static str> {
    if name.is_empty() {
        return Err("task name must not be empty");
    }
    // Task threads carry the name; the OS rejects NUL in thread names.
    if name.contains('\0') {
        return Err("task name must not contain NUL bytes");
    }
    match name.char_indices().nth(MAX_NAME_LEN) {
        Some((cut, _)) => Ok((name[..cut].to_owned(), true)),
        None => Ok((name.to_owned(), false)),
    }
}

/// Bookkeeping for one registered task. Owned by the scheduler registry.
pub(crate) struct TaskRecord {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) state: TaskState,
    pub(crate) priority: u8,
    /// Policy hook; carried but not consulted by the dispatcher.
    pub(crate) nice: i8,
    pub(crate) affinity: Option<usize>,
    pub(crate) cpu_time_ns: u64,
    pub(crate) last_dispatch_ns: u64,
    pub(crate) created_ns: u64,
    pub(crate) terminated_ns: Option<u64>,
    pub(crate) time_slice: Duration,
    pub(crate) dispatch_count: u64,
    /// Set once the activation signal has been delivered.
    pub(crate) activated: bool,
    pub(crate) activation: Activation,
    pub(crate) thread: Option<JoinHandle<()>>,
}

impl TaskRecord {
    pub(crate) fn new(
        id: TaskId,
        name: String,
        priority: u8,
        created_ns: u64,
        activation: Activation,
    ) -> Self {
        Self {
            id,
            name,
            state: TaskState::New,
            priority,
            nice: 0,
            affinity: None,
            cpu_time_ns: 0,
            last_dispatch_ns: 0,
            created_ns,
            terminated_ns: None,
            time_slice: Duration::ZERO,
            dispatch_count: 0,
            activated: false,
            activation,
            thread: None,
        }
    }

    /// Charges the time since the last dispatch to this task and returns the
    /// charged amount.
    pub(crate) fn charge(&mut self, now_ns: u64) -> u64 {
        let elapsed = now_ns.saturating_sub(self.last_dispatch_ns);
        self.cpu_time_ns = self.cpu_time_ns.saturating_add(elapsed);
        self.last_dispatch_ns = now_ns;
        elapsed
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("dispatch_count", &self.dispatch_count)
            .field("cpu_time_ns", &self.cpu_time_ns)
            .finish()
    }
}
