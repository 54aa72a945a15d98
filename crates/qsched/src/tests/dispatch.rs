use std::time::Duration;

use super::*;
use crate::{SchedulerConfig, TaskState, TickOutcome};

#[test]
fn most_urgent_first_then_round_robin_in_creation_order() {
    let (sched, _clock) = default_manual();

    let (a, release_a) = spawn_gated(&sched, "A", 5);
    let b = sched.spawn("B", 0, || {}).unwrap();
    let (c, release_c) = spawn_gated(&sched, "C", 5);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: b, previous: None }
    );
    assert!(sched.wait_terminated(b, WAIT));
    assert_eq!(sched.running(), None);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: a, previous: None }
    );
    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: c, previous: Some(a) }
    );
    assert_eq!(sched.ready_queue(5), vec![a]);
    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: a, previous: Some(c) }
    );
    assert_eq!(sched.ready_queue(5), vec![c]);

    assert_eq!(sched.stats().context_switches, 4);
    release_and_wait(&sched, vec![(a, release_a), (c, release_c)]);
}

#[test]
fn immediate_return_terminates_and_never_requeues() {
    let (sched, _clock) = default_manual();
    let id = sched.spawn("oneshot", 4, || {}).unwrap();

    assert!(matches!(sched.tick().unwrap(), TickOutcome::Dispatched { .. }));
    assert!(sched.wait_terminated(id, WAIT));

    let info = sched.task_info(id).unwrap();
    assert_eq!(info.state, TaskState::Terminated);
    assert_eq!(info.dispatch_count, 1);
    assert!(sched.ready_queue(4).is_empty());

    assert_eq!(sched.tick().unwrap(), TickOutcome::Idle);
    assert_eq!(sched.tick().unwrap(), TickOutcome::Idle);
    assert_eq!(sched.task_info(id).unwrap().dispatch_count, 1);
}

#[test]
fn less_urgent_candidate_does_not_displace_running_task() {
    let (sched, _clock) = default_manual();
    let (urgent, release_urgent) = spawn_gated(&sched, "urgent", 0);
    let (background, release_background) = spawn_gated(&sched, "background", 7);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: urgent, previous: None }
    );
    assert_eq!(sched.tick().unwrap(), TickOutcome::Kept(urgent));
    assert_eq!(sched.ready_queue(7), vec![background]);
    assert_eq!(sched.stats().context_switches, 1);

    // Once the urgent task finishes, the background task gets the slot.
    release_urgent.send(()).unwrap();
    assert!(sched.wait_terminated(urgent, WAIT));
    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: background, previous: None }
    );
    release_and_wait(&sched, vec![(background, release_background)]);
}

#[test]
fn more_urgent_arrival_demotes_running_task_to_tail() {
    let (sched, _clock) = default_manual();
    let (low, release_low) = spawn_gated(&sched, "low", 6);
    let (peer, release_peer) = spawn_gated(&sched, "peer", 6);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: low, previous: None }
    );

    let (high, release_high) = spawn_gated(&sched, "high", 1);
    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: high, previous: Some(low) }
    );
    assert_eq!(sched.task_info(low).unwrap().state, TaskState::Ready);
    assert_eq!(sched.ready_queue(6), vec![peer, low]);

    release_and_wait(
        &sched,
        vec![(high, release_high), (low, release_low)],
    );
    // `peer` was never dispatched; cancel releases its parked thread.
    drop(release_peer);
    sched.cancel(peer).unwrap();
}

#[test]
fn context_switch_counted_only_when_selection_changes() {
    let (sched, _clock) = default_manual();
    let (solo, release) = spawn_gated(&sched, "solo", 2);

    assert!(matches!(sched.tick().unwrap(), TickOutcome::Dispatched { .. }));
    assert_eq!(sched.tick().unwrap(), TickOutcome::Kept(solo));
    assert_eq!(sched.tick().unwrap(), TickOutcome::Kept(solo));

    let stats = sched.stats();
    assert_eq!(stats.context_switches, 1);
    assert_eq!(stats.ticks, 3);
    assert_eq!(sched.task_info(solo).unwrap().dispatch_count, 1);
    release_and_wait(&sched, vec![(solo, release)]);
}

#[test]
fn fifo_order_within_a_level_across_requeues() {
    let (sched, _clock) = default_manual();
    let tasks: Vec<_> = (0..4)
        .map(|n| spawn_gated(&sched, &format!("rr-{n}"), 3))
        .collect();
    let ids: Vec<_> = tasks.iter().map(|(id, _)| *id).collect();

    let mut order = Vec::new();
    for _ in 0..8 {
        match sched.tick().unwrap() {
            TickOutcome::Dispatched { id, .. } => order.push(id),
            other => panic!("unexpected tick outcome {other:?}"),
        }
    }

    let expected: Vec<_> = ids.iter().chain(ids.iter()).copied().collect();
    assert_eq!(order, expected);
    release_and_wait(&sched, tasks);
}

#[test]
fn at_most_one_task_is_running_at_every_snapshot() {
    let (sched, _clock) = default_manual();
    let mut tasks = Vec::new();
    for (n, priority) in [3, 0, 3, 9, 0].into_iter().enumerate() {
        tasks.push(spawn_gated(&sched, &format!("t{n}"), priority));
    }

    for _ in 0..12 {
        sched.tick().unwrap();
        let snapshot = sched.tasks();
        let running: Vec<_> = snapshot
            .iter()
            .filter(|task| task.state == TaskState::Running)
            .map(|task| task.id)
            .collect();
        assert!(running.len() <= 1);
        assert_eq!(running.first().copied(), sched.running());
        for task in &snapshot {
            let queued = sched.ready_queue(task.priority).contains(&task.id);
            assert_eq!(queued, task.state == TaskState::Ready);
        }
    }

    for (id, release) in tasks {
        drop(release);
        if sched.cancel(id).is_err() {
            assert!(sched.wait_terminated(id, WAIT));
        }
    }
}

#[test]
fn cpu_time_charged_on_demotion() {
    let (sched, clock) = default_manual();
    let (a, release_a) = spawn_gated(&sched, "a", 3);
    let (b, release_b) = spawn_gated(&sched, "b", 3);

    sched.tick().unwrap();
    clock.advance(Duration::from_millis(10));
    sched.tick().unwrap();
    clock.advance(Duration::from_millis(4));
    sched.tick().unwrap();

    assert_eq!(sched.task_info(a).unwrap().cpu_time, Duration::from_millis(10));
    assert_eq!(sched.task_info(b).unwrap().cpu_time, Duration::from_millis(4));
    assert_eq!(sched.stats().total_cpu_time, Duration::from_millis(14));

    release_and_wait(&sched, vec![(a, release_a), (b, release_b)]);
}

#[test]
fn idle_time_accrues_between_idle_ticks() {
    let (sched, clock) = default_manual();

    assert_eq!(sched.tick().unwrap(), TickOutcome::Idle);
    clock.advance(Duration::from_millis(7));
    assert_eq!(sched.stats().idle_time, Duration::from_millis(7));

    assert_eq!(sched.tick().unwrap(), TickOutcome::Idle);
    clock.advance(Duration::from_millis(3));
    let (id, release) = spawn_gated(&sched, "late", 0);
    assert!(matches!(sched.tick().unwrap(), TickOutcome::Dispatched { .. }));

    clock.advance(Duration::from_millis(50));
    assert_eq!(sched.stats().idle_time, Duration::from_millis(10));
    release_and_wait(&sched, vec![(id, release)]);
}

#[test]
fn preemption_disabled_keeps_running_task() {
    let (sched, _clock) = manual(SchedulerConfig::builder().preemption(false).build());
    let (first, release_first) = spawn_gated(&sched, "first", 4);
    let (urgent, release_urgent) = spawn_gated(&sched, "urgent", 0);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: urgent, previous: None }
    );
    assert_eq!(sched.tick().unwrap(), TickOutcome::Kept(urgent));

    release_urgent.send(()).unwrap();
    assert!(sched.wait_terminated(urgent, WAIT));
    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: first, previous: None }
    );
    release_and_wait(&sched, vec![(first, release_first)]);
}

#[test]
fn time_slice_scales_with_priority_number() {
    let (sched, _clock) = default_manual();
    let (task, release) = spawn_gated(&sched, "background", 12);

    sched.tick().unwrap();
    let info = sched.task_info(task).unwrap();
    assert_eq!(info.time_slice, sched.quantum() * 2);

    assert_eq!(sched.set_quantum(Duration::from_millis(4)), Duration::from_millis(4));
    assert_eq!(sched.set_quantum(Duration::from_secs(9)), Duration::from_millis(100));
    release_and_wait(&sched, vec![(task, release)]);
}

#[test]
fn huge_quantum_dispatches_background_task() {
    let quantum = Duration::from_secs(u64::MAX / 2);
    let (sched, _clock) = manual(
        SchedulerConfig::builder()
            .quantum_bounds(Duration::from_millis(1), Duration::MAX)
            .quantum(quantum)
            .build(),
    );
    let (task, release) = spawn_gated(&sched, "bg", 20);

    assert_eq!(
        sched.tick().unwrap(),
        TickOutcome::Dispatched { id: task, previous: None }
    );
    assert_eq!(sched.task_info(task).unwrap().time_slice, Duration::MAX);
    assert_eq!(sched.quantum(), quantum);
    release_and_wait(&sched, vec![(task, release)]);
}

#[test]
fn termination_while_demoted_leaves_ready_queue() {
    let (sched, _clock) = default_manual();
    let (a, release_a) = spawn_gated(&sched, "a", 2);
    let (b, release_b) = spawn_gated(&sched, "b", 2);

    sched.tick().unwrap();
    sched.tick().unwrap();
    assert_eq!(sched.ready_queue(2), vec![a]);

    // `a` is only labelled READY; its thread is still inside the entry routine.
    release_a.send(()).unwrap();
    assert!(sched.wait_terminated(a, WAIT));
    assert!(sched.ready_queue(2).is_empty());
    assert_eq!(sched.running(), Some(b));

    release_and_wait(&sched, vec![(b, release_b)]);
}
