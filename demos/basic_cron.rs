//! # Example: basic_cron
//!
//! Two jobs on one scheduler: a heartbeat every two seconds and a flaky
//! importer every three seconds that fails on every other run.
//!
//! Demonstrates how to:
//! - Define jobs with [`JobFn`] and route their results with [`OutcomeFn`].
//! - See the built-in `LogWriter` records through `tracing-subscriber`.
//! - Stop gracefully on Ctrl-C (or after a fixed time with `--once`).
//!
//! ## Flow
//! ```text
//! JobSpec ──► Scheduler::register()
//!     ├─► start()  → one TimerLoop per job
//!     │     └─► NextFireComputed → JobDispatched → JobSucceeded / JobFailed
//!     └─► stop()   → ShutdownRequested → TimerStopped → AllStoppedWithin
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=cronvisor=debug cargo run --example basic_cron
//! cargo run --example basic_cron -- --once
//! ```

use std::time::Duration;

use cronvisor::{
    JobContext, JobError, JobFn, JobRef, JobSpec, OutcomeFn, Scheduler, SchedulerConfig,
};
use tracing_subscriber::EnvFilter;

fn heartbeat() -> JobRef {
    JobFn::arc("heartbeat", |ctx: JobContext| async move {
        Ok(serde_json::json!({ "beat": ctx.seq(), "at": ctx.dispatched_at().to_rfc3339() }))
    })
}

fn importer() -> JobRef {
    JobFn::arc("importer", |ctx: JobContext| async move {
        for _ in 0..4 {
            if ctx.is_killed() {
                return Err(JobError::fail("scheduler killed mid-import"));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if ctx.seq() % 2 == 0 {
            return Err(JobError::fail("upstream returned 503"));
        }
        Ok(serde_json::json!({ "rows": ctx.seq() * 100 }))
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = SchedulerConfig {
        grace: Duration::from_secs(5),
        ..SchedulerConfig::default()
    };
    let sched = Scheduler::builder(cfg).build();

    let printer = OutcomeFn::arc(
        |ctx: &JobContext, out: serde_json::Value| println!("[{}#{}] ok {out}", ctx.job(), ctx.seq()),
        |ctx: &JobContext, err: &JobError| println!("[{}#{}] {err}", ctx.job(), ctx.seq()),
    );

    sched
        .register(
            JobSpec::with_defaults(heartbeat(), "*/2 * * * * *", sched.config())?
                .with_fire_immediately(true)
                .with_outcome(printer.clone()),
        )
        .await?;
    sched
        .register(JobSpec::new(importer(), "*/3 * * * * *")?.with_outcome(printer))
        .await?;

    if std::env::args().any(|a| a == "--once") {
        sched.start().await?;
        tokio::time::sleep(Duration::from_secs(10)).await;
        sched.stop().await?;
    } else {
        println!("jobs: {:?} (Ctrl-C to stop)", sched.jobs().await);
        sched.run_until_signal().await?;
    }

    println!("final state: {:?}", sched.state().await);
    Ok(())
}
