mod logger;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::{info, warn};
use qsched::{Scheduler, SchedulerConfig, SchedulerStats, TaskSnapshot};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Boots the qsched scheduler with a demo workload")]
struct Opts {
    /// Base scheduling quantum in milliseconds.
    #[arg(long, default_value_t = 10, value_name = "MS")]
    quantum_ms: u64,

    /// Number of priority levels (0 is most urgent).
    #[arg(long, default_value_t = 32)]
    levels: usize,

    /// Maximum number of registered tasks.
    #[arg(long, default_value_t = 64)]
    capacity: usize,

    #[arg(long = "no-preempt")]
    no_preempt: bool,

    /// Number of demo tasks to submit.
    #[arg(long, default_value_t = 8)]
    tasks: usize,

    /// Work each demo task performs, in milliseconds.
    #[arg(long, default_value_t = 20, value_name = "MS")]
    work_ms: u64,

    /// How long to let the loop run before stopping it.
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    run_ms: u64,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn config(&self) -> SchedulerConfig {
        SchedulerConfig::builder()
            .name("qboot")
            .priority_levels(self.levels)
            .capacity(self.capacity)
            .quantum(Duration::from_millis(self.quantum_ms))
            .preemption(!self.no_preempt)
            .build()
    }

    /// Spreads demo task `index` evenly over the configured levels.
    fn priority_for(&self, index: usize) -> i32 {
        let levels = self.levels.max(1);
        let tasks = self.tasks.max(1);
        (index * levels / tasks) as i32
    }
}

struct Work {
    index: usize,
    duration: Duration,
}

fn demo_task(work: Work) {
    let deadline = Instant::now() + work.duration;
    let mut rounds = 0u64;
    while Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
        rounds += 1;
    }
    log::debug!("demo task {} finished after {rounds} rounds", work.index);
}

#[derive(Serialize)]
struct Report {
    stats: SchedulerStats,
    tasks: Vec<TaskSnapshot>,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    logger::init(opts.verbose).context("installing console logger")?;

    let sched = Scheduler::new(opts.config()).context("invalid scheduler configuration")?;
    sched.init()?;

    for index in 0..opts.tasks {
        let work = Work {
            index,
            duration: Duration::from_millis(opts.work_ms),
        };
        let name = format!("demo-{index}");
        let id = sched
            .create(&name, demo_task, work, opts.priority_for(index))
            .with_context(|| format!("submitting {name}"))?;
        info!("submitted {name} as task {id}");
    }

    let (interrupt, interrupted) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(());
    })
    .context("installing Ctrl-C handler")?;

    sched.start()?;
    match interrupted.recv_timeout(Duration::from_millis(opts.run_ms)) {
        Ok(()) => warn!("interrupted, stopping scheduler"),
        Err(RecvTimeoutError::Timeout) => info!("run time elapsed, stopping scheduler"),
        Err(RecvTimeoutError::Disconnected) => {}
    }
    sched.stop()?;

    let report = Report {
        stats: sched.stats(),
        tasks: sched.tasks(),
    };
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &Report) {
    let stats = &report.stats;
    println!("{}", "scheduler".bold());
    println!("  context switches : {}", stats.context_switches);
    println!("  ticks            : {}", stats.ticks);
    println!("  quantum          : {:?}", stats.quantum);
    println!("  cpu time         : {:?}", stats.total_cpu_time);
    println!("  idle time        : {:?}", stats.idle_time);
    println!(
        "  tasks            : {} active / {} registered / {} ready",
        stats.active_tasks, stats.registered_tasks, stats.ready_tasks
    );

    println!();
    println!(
        "{}",
        format!(
            "{:>6}  {:<16} {:<10} {:>4} {:>10} {:>12} {:>8}",
            "id", "name", "state", "prio", "dispatches", "cpu", "slice"
        )
        .bold()
    );
    for task in &report.tasks {
        println!(
            "{:>6}  {:<16} {:<10} {:>4} {:>10} {:>12} {:>8}",
            task.id.to_string(),
            task.name,
            format!("{:?}", task.state),
            task.priority,
            task.dispatch_count,
            format!("{:?}", task.cpu_time),
            format!("{:?}", task.time_slice),
        );
    }
}
