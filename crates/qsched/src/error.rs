//! Scheduler error taxonomy.

use std::io;

use thiserror::Error;

use crate::task::{TaskId, TaskState};

/// Errors returned by the scheduler API.
///
/// Creation-path failures never leave partial state behind: whatever was
/// acquired before the failing step is released before the error is returned.
#[derive(Error, Debug)]
pub enum SchedError {
    #[error("task registry full ({capacity} tasks)")]
    CapacityExceeded { capacity: usize },
    #[error("allocation failed: {0}")]
    AllocationFailure(&'static str),
    #[error("could not spawn task execution context: {0}")]
    ActivationFailure(#[source] io::Error),
    #[error("dispatch loop already running")]
    AlreadyRunning,
    #[error("dispatch loop not running")]
    NotRunning,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("scheduler not initialized")]
    NotInitialized,
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
    #[error("task {id} cannot be cancelled in state {state:?}")]
    NotCancellable { id: TaskId, state: TaskState },
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}

pub type Result<T> = core::result::Result<T, SchedError>;
