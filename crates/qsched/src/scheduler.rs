//! Task registry, dispatch loop and the public scheduler API.
//!
//! All bookkeeping (registry, ready queues, the RUNNING slot, counters) sits
//! behind one coarse `parking_lot::Mutex`. A task thread never touches it
//! while parked, and takes it once when its entry routine returns.

use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::activation::{Activation, Signal};
use crate::clock::{Clock, MonotonicClock};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedError};
use crate::ready::ReadyQueues;
use crate::stats::{SchedulerStats, TaskSnapshot};
use crate::task::{normalize_name, TaskEntry, TaskId, TaskRecord, TaskState, MAX_NAME_LEN};
use crate::trace::{PendingTrace, TraceEvent, TraceHook};

/// Result of one dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// `id` took the RUNNING slot from `previous`.
    Dispatched { id: TaskId, previous: Option<TaskId> },
    /// The RUNNING task keeps its slot.
    Kept(TaskId),
    /// Nothing READY, nothing RUNNING.
    Idle,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    context_switches: u64,
    total_cpu_ns: u64,
    idle_ns: u64,
    ticks: u64,
}

/// Registry and queues, allocated by `init()`.
struct Core {
    slots: Vec<Option<TaskRecord>>,
    free: Vec<usize>,
    by_id: HashMap<TaskId, usize>,
    ready: ReadyQueues,
    running: Option<usize>,
    next_id: u64,
    counters: Counters,
    /// Clock reading of the last idle tick, until the next tick settles it.
    idle_since: Option<u64>,
}

impl Core {
    fn try_new(config: &SchedulerConfig) -> Result<Self> {
        let capacity = config.capacity;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| SchedError::AllocationFailure("task registry"))?;
        slots.resize_with(capacity, || None);

        let mut free = Vec::new();
        free.try_reserve_exact(capacity)
            .map_err(|_| SchedError::AllocationFailure("free slot list"))?;
        free.extend((0..capacity).rev());

        let mut by_id = HashMap::new();
        by_id
            .try_reserve(capacity)
            .map_err(|_| SchedError::AllocationFailure("task index"))?;

        let ready = ReadyQueues::try_new(config.priority_levels, capacity)
            .map_err(|_| SchedError::AllocationFailure("ready queues"))?;

        Ok(Self {
            slots,
            free,
            by_id,
            ready,
            running: None,
            next_id: 1,
            counters: Counters::default(),
            idle_since: None,
        })
    }

    fn slot_of(&self, id: TaskId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    fn record(&self, id: TaskId) -> Option<&TaskRecord> {
        let slot = self.slot_of(id)?;
        self.slots[slot].as_ref()
    }

    fn id_at(&self, slot: usize) -> TaskId {
        record_at(&self.slots, slot).id
    }

    fn occupancy(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn work_pending_while_idle(&self) -> bool {
        self.idle_since.is_some() && !self.ready.is_empty()
    }
}

/// Body of a task thread.
pub(crate) type ThreadBody = Box<dyn FnOnce() + Send + 'static>;

/// Starts a named OS thread running a task body.
pub(crate) type ThreadSpawner =
    Arc<dyn Fn(thread::Builder, ThreadBody) -> io::Result<JoinHandle<()>> + Send + Sync>;

fn os_spawner() -> ThreadSpawner {
    Arc::new(|builder: thread::Builder, body: ThreadBody| builder.spawn(body))
}

fn record_at(slots: &[Option<TaskRecord>], slot: usize) -> &TaskRecord {
    slots[slot]
        .as_ref()
        .expect("scheduler registry invariant broken")
}

fn record_at_mut(slots: &mut [Option<TaskRecord>], slot: usize) -> &mut TaskRecord {
    slots[slot]
        .as_mut()
        .expect("scheduler registry invariant broken")
}

struct State {
    core: Option<Core>,
    quantum: Duration,
    /// Liveness flag of the dispatch loop.
    dispatching: bool,
}

struct Shared {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    trace: Option<TraceHook>,
    spawner: ThreadSpawner,
    state: Mutex<State>,
    /// Wakes the dispatch loop: stop, or work arriving while idle.
    wake: Condvar,
    /// Signals task termination to `wait_terminated` callers.
    exited: Condvar,
}

impl Shared {
    fn tick(&self) -> Result<TickOutcome> {
        let mut pending = PendingTrace::default();
        let outcome = {
            let mut state = self.state.lock();
            let quantum = state.quantum;
            let core = state.core.as_mut().ok_or(SchedError::NotInitialized)?;
            let now = self.clock.now_ns();
            self.dispatch(core, now, quantum, &mut pending)
        };
        pending.emit(self.trace.as_ref());
        Ok(outcome)
    }

    fn dispatch(
        &self,
        core: &mut Core,
        now: u64,
        quantum: Duration,
        pending: &mut PendingTrace,
    ) -> TickOutcome {
        if let Some(since) = core.idle_since.take() {
            core.counters.idle_ns = core
                .counters
                .idle_ns
                .saturating_add(now.saturating_sub(since));
        }
        core.counters.ticks += 1;

        let running = core.running;
        let candidate = core.ready.first_non_empty();

        let level = match (candidate, running) {
            (None, None) => {
                core.idle_since = Some(now);
                pending.push(TraceEvent::Idle);
                trace!("tick {}: idle", core.counters.ticks);
                return TickOutcome::Idle;
            }
            (None, Some(slot)) => return TickOutcome::Kept(core.id_at(slot)),
            (Some(_), Some(slot)) if !self.config.preemption => {
                return TickOutcome::Kept(core.id_at(slot));
            }
            (Some(level), Some(slot)) if level > record_at(&core.slots, slot).priority => {
                return TickOutcome::Kept(core.id_at(slot));
            }
            (Some(level), _) => level,
        };

        let next = core
            .ready
            .dequeue_head(level)
            .expect("non-empty ready level has a head");

        let previous = match core.running.take() {
            Some(prev) => {
                let outgoing = record_at_mut(&mut core.slots, prev);
                let charged = outgoing.charge(now);
                outgoing.state = TaskState::Ready;
                let (id, priority) = (outgoing.id, outgoing.priority);
                core.counters.total_cpu_ns = core.counters.total_cpu_ns.saturating_add(charged);
                core.ready.enqueue(prev, priority);
                pending.push(TraceEvent::Requeued { id, priority });
                Some(id)
            }
            None => None,
        };

        let incoming = record_at_mut(&mut core.slots, next);
        incoming.state = TaskState::Running;
        incoming.last_dispatch_ns = now;
        incoming.dispatch_count += 1;
        incoming.time_slice = SchedulerConfig::time_slice(quantum, incoming.priority);
        if !incoming.activated {
            incoming.activated = true;
            incoming.activation.activate();
        }
        let id = incoming.id;
        let slice = incoming.time_slice;

        core.running = Some(next);
        core.counters.context_switches += 1;
        pending.push(TraceEvent::Dispatched {
            id,
            previous,
            slice,
        });
        trace!(
            "tick {}: dispatch {id} (prio {level}, slice {slice:?}) replacing {previous:?}",
            core.counters.ticks
        );

        TickOutcome::Dispatched { id, previous }
    }

    /// Called on a task's own thread once its entry routine has returned.
    fn task_exited(&self, slot: usize, id: TaskId) {
        let mut pending = PendingTrace::default();
        {
            let mut state = self.state.lock();
            let Some(core) = state.core.as_mut() else {
                return;
            };
            if core.slot_of(id) != Some(slot) {
                return;
            }
            let now = self.clock.now_ns();

            if core.running == Some(slot) {
                core.running = None;
                let charged = record_at_mut(&mut core.slots, slot).charge(now);
                core.counters.total_cpu_ns = core.counters.total_cpu_ns.saturating_add(charged);
            } else {
                // Demoted to READY while its thread kept executing.
                core.ready.remove(slot);
            }

            let record = record_at_mut(&mut core.slots, slot);
            record.state = TaskState::Terminated;
            record.terminated_ns = Some(now);
            debug!(
                "task {id} '{}' terminated after {} dispatches",
                record.name, record.dispatch_count
            );
            pending.push(TraceEvent::Terminated { id });
        }
        self.exited.notify_all();
        pending.emit(self.trace.as_ref());
    }

    /// Waits for the next tick. Returns false once the loop should exit.
    fn wait_next_tick(&self) -> bool {
        let mut state = self.state.lock();
        let deadline = Instant::now().checked_add(state.quantum);
        loop {
            if !state.dispatching {
                return false;
            }
            if state
                .core
                .as_ref()
                .is_some_and(Core::work_pending_while_idle)
            {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut state, deadline).timed_out() {
                        return state.dispatching;
                    }
                }
                None => self.wake.wait(&mut state),
            }
        }
    }
}

fn run_dispatcher(shared: Arc<Shared>) {
    debug!("dispatch loop running");
    loop {
        if let Err(err) = shared.tick() {
            error!("dispatch loop aborted: {err}");
            shared.state.lock().dispatching = false;
            break;
        }
        if !shared.wait_next_tick() {
            break;
        }
    }
    debug!("dispatch loop exited");
}

fn run_task(shared: Weak<Shared>, slot: usize, id: TaskId, activation: Activation, entry: TaskEntry) {
    if activation.wait() != Signal::Activated {
        trace!("task {id} released without activation");
        return;
    }

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry)) {
        error!("task {id} panicked: {}", panic_message(payload.as_ref()));
    }

    if let Some(shared) = shared.upgrade() {
        shared.task_exited(slot, id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

fn snapshot(record: &TaskRecord) -> TaskSnapshot {
    TaskSnapshot {
        id: record.id,
        name: record.name.clone(),
        state: record.state,
        priority: record.priority,
        nice: record.nice,
        affinity: record.affinity,
        dispatch_count: record.dispatch_count,
        cpu_time: Duration::from_nanos(record.cpu_time_ns),
        time_slice: record.time_slice,
        created_at: Duration::from_nanos(record.created_ns),
    }
}

/// Builder for constructing a [`Scheduler`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clock: Option<Arc<dyn Clock>>,
    trace: Option<TraceHook>,
    spawner: ThreadSpawner,
}

impl SchedulerBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clock: None,
            trace: None,
            spawner: os_spawner(),
        }
    }

    /// Replaces the host monotonic clock.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: Arc<C>) -> Self {
        self.clock = Some(clock as Arc<dyn Clock>);
        self
    }

    /// Installs an observer for scheduling decisions.
    pub fn with_trace_hook(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_thread_spawner(mut self, spawner: ThreadSpawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Validates the configuration and builds the scheduler. Registry memory
    /// is not allocated until [`Scheduler::init`].
    pub fn build(self) -> Result<Scheduler> {
        self.config.validate()?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };
        let quantum = self.config.quantum;

        Ok(Scheduler {
            shared: Arc::new(Shared {
                config: self.config,
                clock,
                trace: self.trace,
                spawner: self.spawner,
                state: Mutex::new(State {
                    core: None,
                    quantum,
                    dispatching: false,
                }),
                wake: Condvar::new(),
                exited: Condvar::new(),
            }),
            dispatcher: Mutex::new(None),
        })
    }
}

/// Multi-level priority scheduler.
///
/// Owns every task record for the task's whole life. Share it between call
/// sites with `Arc<Scheduler>`; independent instances do not interact.
pub struct Scheduler {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a builder with the default configuration.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new(SchedulerConfig::default())
    }

    /// Creates a builder with the given configuration.
    pub fn with_config(config: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(config)
    }

    /// Builds a scheduler with `config`, the host clock and no trace hook.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_config(config).build()
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Allocates the registry and ready queues. Calling it again is a no-op.
    pub fn init(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.core.is_some() {
            debug!("scheduler '{}' already initialized", self.shared.config.name);
            return Ok(());
        }
        state.core = Some(Core::try_new(&self.shared.config)?);
        info!(
            "scheduler '{}' initialized: {} levels, capacity {}, quantum {:?}",
            self.shared.config.name,
            self.shared.config.priority_levels,
            self.shared.config.capacity,
            state.quantum
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.state.lock().core.is_some()
    }

    /// Submits `entry(arg)` as a new task at `priority`.
    ///
    /// The priority is clamped into `[0, L - 1]` and the name truncated to
    /// [`MAX_NAME_LEN`] characters. The entry routine runs exactly once, on
    /// the task's own thread, after the task is first dispatched.
    pub fn create<A>(&self, name: &str, entry: fn(A), arg: A, priority: i32) -> Result<TaskId>
    where
        A: Send + 'static,
    {
        self.spawn(name, priority, move || entry(arg))
    }

    /// Closure form of [`Scheduler::create`]; the closure owns its argument.
    pub fn spawn<F>(&self, name: &str, priority: i32, entry: F) -> Result<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let (name, truncated) = normalize_name(name).map_err(SchedError::InvalidArgument)?;
        if truncated {
            warn!("task name truncated to {MAX_NAME_LEN} characters: '{name}'");
        }
        let priority = self.shared.config.clamp_priority(priority);
        let entry: TaskEntry = Box::new(entry);

        let mut pending = PendingTrace::default();
        let id = {
            let mut state = self.shared.state.lock();
            let core = state.core.as_mut().ok_or(SchedError::NotInitialized)?;

            if core.free.is_empty() {
                return Err(SchedError::CapacityExceeded {
                    capacity: self.shared.config.capacity,
                });
            }
            let slot = core.free[core.free.len() - 1];
            let id = TaskId::new(core.next_id);
            let activation = Activation::new();
            let thread = self
                .spawn_task_thread(slot, id, &name, activation.clone(), entry)
                .map_err(SchedError::ActivationFailure)?;

            core.free.pop();
            core.next_id += 1;
            let now = self.shared.clock.now_ns();
            let mut record = TaskRecord::new(id, name, priority, now, activation);
            record.thread = Some(thread);
            record.state = TaskState::Ready;
            debug!("task {id} '{}' created at priority {priority}", record.name);
            core.slots[slot] = Some(record);
            // Reserved for `capacity` entries at init; never reallocates.
            core.by_id.insert(id, slot);
            core.ready.enqueue(slot, priority);

            if core.idle_since.is_some() {
                self.shared.wake.notify_one();
            }
            pending.push(TraceEvent::Created { id, priority });
            id
        };
        pending.emit(self.shared.trace.as_ref());
        Ok(id)
    }

    fn spawn_task_thread(
        &self,
        slot: usize,
        id: TaskId,
        name: &str,
        activation: Activation,
        entry: TaskEntry,
    ) -> io::Result<JoinHandle<()>> {
        let shared = Arc::downgrade(&self.shared);
        (self.shared.spawner)(
            thread::Builder::new().name(name.to_owned()),
            Box::new(move || run_task(shared, slot, id, activation, entry)),
        )
    }

    /// Cancels a task that has not been activated yet. Its entry routine
    /// never runs.
    pub fn cancel(&self, id: TaskId) -> Result<()> {
        let mut pending = PendingTrace::default();
        {
            let mut state = self.shared.state.lock();
            let core = state.core.as_mut().ok_or(SchedError::NotInitialized)?;
            let slot = core.slot_of(id).ok_or(SchedError::UnknownTask(id))?;

            let record = record_at(&core.slots, slot);
            if record.activated || record.state.is_terminated() {
                return Err(SchedError::NotCancellable {
                    id,
                    state: record.state,
                });
            }

            core.ready.remove(slot);
            let now = self.shared.clock.now_ns();
            let record = record_at_mut(&mut core.slots, slot);
            record.state = TaskState::Terminated;
            record.terminated_ns = Some(now);
            record.activation.cancel();
            debug!("task {id} '{}' cancelled", record.name);
            pending.push(TraceEvent::Cancelled { id });
        }
        self.shared.exited.notify_all();
        pending.emit(self.shared.trace.as_ref());
        Ok(())
    }

    /// Removes terminated tasks from the registry, freeing their slots, and
    /// joins their threads. Returns the number of tasks removed.
    pub fn reap(&self) -> usize {
        let mut threads = Vec::new();
        {
            let mut state = self.shared.state.lock();
            let Some(core) = state.core.as_mut() else {
                return 0;
            };
            for slot in 0..core.slots.len() {
                let terminated = core.slots[slot]
                    .as_ref()
                    .is_some_and(|record| record.state.is_terminated());
                if !terminated {
                    continue;
                }
                if let Some(mut record) = core.slots[slot].take() {
                    core.by_id.remove(&record.id);
                    core.free.push(slot);
                    if let Some(thread) = record.thread.take() {
                        threads.push((record.id, thread));
                    }
                }
            }
        }

        let reaped = threads.len();
        for (id, thread) in threads {
            if thread.join().is_err() {
                error!("task {id} thread panicked outside its entry routine");
            }
        }
        if reaped > 0 {
            debug!("reaped {reaped} terminated tasks");
        }
        reaped
    }

    /// Starts the dispatch loop on its own thread.
    pub fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        let quantum = {
            let mut state = self.shared.state.lock();
            if state.core.is_none() {
                return Err(SchedError::NotInitialized);
            }
            if state.dispatching {
                return Err(SchedError::AlreadyRunning);
            }
            state.dispatching = true;
            state.quantum
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-dispatch", self.shared.config.name))
            .spawn(move || run_dispatcher(shared));

        match spawned {
            Ok(handle) => {
                *dispatcher = Some(handle);
                info!(
                    "scheduler '{}' started, quantum {quantum:?}",
                    self.shared.config.name
                );
                Ok(())
            }
            Err(err) => {
                self.shared.state.lock().dispatching = false;
                Err(SchedError::ActivationFailure(err))
            }
        }
    }

    /// Stops the dispatch loop and waits for it to exit. Tasks keep running
    /// on their own threads; the RUNNING label stays where it was.
    pub fn stop(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        {
            let mut state = self.shared.state.lock();
            if !state.dispatching {
                return Err(SchedError::NotRunning);
            }
            state.dispatching = false;
        }
        self.shared.wake.notify_all();

        if let Some(handle) = dispatcher.take() {
            if handle.join().is_err() {
                error!("dispatch loop thread panicked");
            }
        }
        info!("scheduler '{}' stopped", self.shared.config.name);
        Ok(())
    }

    /// Returns true while the dispatch loop is live.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().dispatching
    }

    /// Runs one dispatch step on the calling thread.
    pub fn tick(&self) -> Result<TickOutcome> {
        self.shared.tick()
    }

    /// Current quantum.
    pub fn quantum(&self) -> Duration {
        self.shared.state.lock().quantum
    }

    /// Changes the quantum, clamped into the configured bounds, and returns
    /// the effective value. Applies from the next tick.
    pub fn set_quantum(&self, quantum: Duration) -> Duration {
        let quantum = self.shared.config.clamp_quantum(quantum);
        self.shared.state.lock().quantum = quantum;
        debug!("quantum set to {quantum:?}");
        quantum
    }

    /// Blocks until task `id` is terminated or `timeout` elapses. Returns
    /// false on timeout or if the task is unknown.
    pub fn wait_terminated(&self, id: TaskId, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        loop {
            let terminated = match state.core.as_ref().and_then(|core| core.record(id)) {
                Some(record) => record.state.is_terminated(),
                None => return false,
            };
            if terminated {
                return true;
            }
            let Some(deadline) = deadline else {
                self.shared.exited.wait(&mut state);
                continue;
            };
            if self
                .shared
                .exited
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state
                    .core
                    .as_ref()
                    .and_then(|core| core.record(id))
                    .is_some_and(|record| record.state.is_terminated());
            }
        }
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        let Some(core) = state.core.as_ref() else {
            return SchedulerStats {
                quantum: state.quantum,
                ..SchedulerStats::default()
            };
        };

        let open_idle = core
            .idle_since
            .map_or(0, |since| self.shared.clock.now_ns().saturating_sub(since));
        SchedulerStats {
            context_switches: core.counters.context_switches,
            total_cpu_time: Duration::from_nanos(core.counters.total_cpu_ns),
            idle_time: Duration::from_nanos(core.counters.idle_ns.saturating_add(open_idle)),
            quantum: state.quantum,
            ticks: core.counters.ticks,
            active_tasks: core
                .slots
                .iter()
                .flatten()
                .filter(|record| !record.state.is_terminated())
                .count(),
            registered_tasks: core.occupancy(),
            ready_tasks: core.ready.total_len(),
            running: core.running.map(|slot| core.id_at(slot)),
        }
    }

    /// Snapshot of one task, or `None` if unknown or reaped.
    pub fn task_info(&self, id: TaskId) -> Option<TaskSnapshot> {
        let state = self.shared.state.lock();
        state.core.as_ref()?.record(id).map(snapshot)
    }

    /// Snapshots of every registered task, ordered by id.
    pub fn tasks(&self) -> Vec<TaskSnapshot> {
        let state = self.shared.state.lock();
        let Some(core) = state.core.as_ref() else {
            return Vec::new();
        };
        let mut tasks: Vec<_> = core.slots.iter().flatten().map(snapshot).collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    /// Ids queued READY at `level`, head first.
    pub fn ready_queue(&self, level: u8) -> Vec<TaskId> {
        let state = self.shared.state.lock();
        let Some(core) = state.core.as_ref() else {
            return Vec::new();
        };
        core.ready
            .iter(level)
            .map(|slot| core.id_at(slot))
            .collect()
    }

    /// Task holding the RUNNING slot.
    pub fn running(&self) -> Option<TaskId> {
        let state = self.shared.state.lock();
        let core = state.core.as_ref()?;
        core.running.map(|slot| core.id_at(slot))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                debug!("scheduler '{}' stop on drop: {err}", self.shared.config.name);
            }
        }

        // Parked threads would otherwise wait forever.
        let mut state = self.shared.state.lock();
        if let Some(core) = state.core.as_mut() {
            for record in core.slots.iter_mut().flatten() {
                if !record.activated && record.activation.cancel() {
                    record.state = TaskState::Terminated;
                }
            }
        }
    }
}
