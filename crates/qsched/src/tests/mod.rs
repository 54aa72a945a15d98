use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::{ManualClock, Scheduler, SchedulerConfig, TaskId};

mod dispatch;

const WAIT: Duration = Duration::from_secs(5);

/// Initialized scheduler driven by a manual clock; the loop is never started.
fn manual(config: SchedulerConfig) -> (Scheduler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let sched = Scheduler::with_config(config)
        .with_clock(Arc::clone(&clock))
        .build()
        .unwrap();
    sched.init().unwrap();
    (sched, clock)
}

fn default_manual() -> (Scheduler, Arc<ManualClock>) {
    manual(SchedulerConfig::default())
}

/// Entry routine that blocks until the returned sender is used or dropped.
fn gate() -> (Sender<()>, impl FnOnce() + Send + 'static) {
    let (release, wait): (Sender<()>, Receiver<()>) = mpsc::channel();
    (release, move || {
        let _ = wait.recv();
    })
}

fn spawn_gated(sched: &Scheduler, name: &str, priority: i32) -> (TaskId, Sender<()>) {
    let (release, entry) = gate();
    let id = sched.spawn(name, priority, entry).unwrap();
    (id, release)
}

fn release_and_wait(sched: &Scheduler, tasks: Vec<(TaskId, Sender<()>)>) {
    for (id, release) in tasks {
        let _ = release.send(());
        assert!(sched.wait_terminated(id, WAIT), "task {id} did not finish");
    }
}
