//! Activation handshake between the dispatcher and a task thread.
//!
//! Each task thread parks on its own [`Activation`] right after it is spawned.
//! The dispatcher delivers exactly one signal: `Activated` the first time the
//! task is dispatched, or `Cancelled` when the task is cancelled or the
//! scheduler is dropped while the task is still parked. No signal ever crosses
//! between tasks.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Waiting for the first dispatch.
    Parked,
    /// Entry routine may run.
    Activated,
    /// Task must exit without running its entry routine.
    Cancelled,
}

struct Inner {
    signal: Mutex<Signal>,
    cond: Condvar,
}

/// Private signal/wait pair owned by one task.
#[derive(Clone)]
pub struct Activation {
    inner: Arc<Inner>,
}

impl Activation {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                signal: Mutex::new(Signal::Parked),
                cond: Condvar::new(),
            }),
        }
    }

    /// Releases the parked task into its entry routine. Returns false if the
    /// handshake already completed.
    pub fn activate(&self) -> bool {
        self.deliver(Signal::Activated)
    }

    /// Releases the parked task without running it. Returns false if the
    /// handshake already completed.
    pub fn cancel(&self) -> bool {
        self.deliver(Signal::Cancelled)
    }

    /// Blocks until a signal arrives and returns it.
    pub fn wait(&self) -> Signal {
        let mut signal = self.inner.signal.lock();
        while *signal == Signal::Parked {
            self.inner.cond.wait(&mut signal);
        }
        *signal
    }

    fn deliver(&self, to: Signal) -> bool {
        let mut signal = self.inner.signal.lock();
        if *signal != Signal::Parked {
            return false;
        }
        *signal = to;
        drop(signal);
        self.inner.cond.notify_one();
        true
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}
