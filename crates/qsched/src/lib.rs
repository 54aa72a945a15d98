//! # qsched
//!
//! A multi-level priority preemptive task scheduler for hosted targets. Tasks
//! are submitted with a name, an entry routine and a priority level; a
//! dispatch loop ticking once per quantum picks the most urgent,
//! earliest-queued READY task and demotes the previous one to the tail of its
//! own level (round-robin within a level, strict priority across levels).
//!
//! ## Execution model
//!
//! Every task runs on its own host thread, parked until the dispatcher
//! activates it for the first time. From then on the thread runs freely:
//! RUNNING is the label the dispatcher uses for accounting and fairness, not a
//! guarantee that the task owns the CPU. A task that ignores its time slice
//! keeps running in parallel with whatever the dispatcher selects next. Only
//! the task's own return ends it.
//!
//! ## Module Overview
//! - [`task`]       – Task record, identity and state machine.
//! - [`ready`]      – Per-level FIFO ready queues over an index arena.
//! - [`activation`] – Park/activate handshake for task threads.
//! - [`scheduler`]  – Registry, dispatch loop and public API.
//! - [`stats`]      – Aggregate and per-task snapshots.
//! - [`clock`]      – Monotonic time sources.
//! - [`config`]     – Scheduler sizing and timing configuration.
//! - [`trace`]      – Typed scheduler events for an optional observer.
//!
//! ```no_run
//! use std::time::Duration;
//! use qsched::{Scheduler, SchedulerConfig};
//!
//! let sched = Scheduler::with_config(
//!     SchedulerConfig::builder()
//!         .quantum(Duration::from_millis(5))
//!         .build(),
//! )
//! .build()?;
//! sched.init()?;
//! let id = sched.create("worker", |n: u32| println!("got {n}"), 7, 3)?;
//! sched.start()?;
//! sched.wait_terminated(id, Duration::from_secs(1));
//! sched.stop()?;
//! # Ok::<(), qsched::SchedError>(())
//! ```

pub mod activation;
pub mod clock;
pub mod config;
pub mod error;
pub mod ready;
pub mod scheduler;
pub mod stats;
pub mod task;
pub mod trace;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use error::{Result, SchedError};
pub use scheduler::{Scheduler, SchedulerBuilder, TickOutcome};
pub use stats::{SchedulerStats, TaskSnapshot};
pub use task::{TaskId, TaskState, MAX_NAME_LEN};
pub use trace::{TraceEvent, TraceHook};

#[cfg(test)]
mod tests;
