//! # cronvisor
//!
//! **Cronvisor** is a lightweight cron job scheduler for tokio applications.
//!
//! Jobs are registered with a cron expression; one timer loop per job computes
//! the next fire instant and dispatches an execution when it is due. Executions
//! run detached, may overlap, and report their outcome through a one-shot
//! [`ResultLink`] to the job's [`Outcome`] callbacks.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   JobSpec    │   │   JobSpec    │   │   JobSpec    │
//!     │ job + "expr" │   │ job + "expr" │   │ job + "expr" │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - Registry (name → spec + timer handle)                          │
//! │  - shutdown / kill CancellationTokens                             │
//! │  - TaskTracker (every in-flight dispatch)                         │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  TimerLoop   │   │  TimerLoop   │   │  TimerLoop   │   │
//!     │ CronCursor   │   │ CronCursor   │   │ CronCursor   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ due              │ due              │ due             │
//!      ▼                  ▼                  ▼                 │
//!   Dispatcher ──► job.run(ctx) ──► ResultLink ──► Outcome     │
//!      │                                                       │
//!      ▼                                                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                (capacity: SchedulerConfig::bus_capacity)          │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │     bus listener       │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter    sub 2  ...  sub N
//! ```
//!
//! ### Timer loop
//! ```text
//! loop {
//!   ├─► shutdown cancelled?                 → exit
//!   ├─► next unset → next = cursor.next()   → NextFireComputed
//!   ├─► now ≥ next → dispatch(seq, next)    → JobDispatched
//!   │                unset next
//!   ├─► iteration panicked                  → TimerError, continue
//!   └─► sleep(poll_interval) or shutdown
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**    | Register jobs, start, stop within a grace period, kill.      | [`Scheduler`], [`SchedulerBuilder`]        |
//! | **Jobs**          | Handlers as closures or trait objects, per-dispatch context. | [`Job`], [`JobFn`], [`JobSpec`], [`JobContext`] |
//! | **Outcomes**      | Success / error callbacks per job.                           | [`Outcome`], [`OutcomeFn`], [`Discard`]    |
//! | **Cron**          | 5/6/7-field expressions, strictly increasing instants.       | [`CronCursor`]                             |
//! | **Time**          | Pluggable wall clock, virtual time in tests.                 | [`Clock`], [`SystemClock`], [`TokioClock`] |
//! | **Subscriber API**| Observe timer and dispatch activity (logging, metrics).      | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors for the API, executions and timer iterations.   | [`SchedulerError`], [`JobError`], [`TimerError`] |
//! | **Configuration** | Centralize runtime settings.                                 | [`SchedulerConfig`]                        |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use cronvisor::{JobContext, JobError, JobFn, JobSpec, OutcomeFn, Scheduler, SchedulerConfig};
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sched = Scheduler::builder(SchedulerConfig::default()).build();
//!
//!     let report = JobFn::arc("report", |ctx: JobContext| async move {
//!         Ok(serde_json::json!({ "run": ctx.seq() }))
//!     });
//!     let outcome = OutcomeFn::arc(
//!         |ctx: &JobContext, out: serde_json::Value| println!("{} -> {out}", ctx.job()),
//!         |ctx: &JobContext, err: &JobError| eprintln!("{} failed: {err}", ctx.job()),
//!     );
//!     sched
//!         .register(JobSpec::new(report, "*/15 * * * * *")?.with_outcome(outcome))
//!         .await?;
//!
//!     sched.start().await?;
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//!     sched.stop().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Clock, ClockRef, CronCursor, LinkOutcome, LinkPublisher, ResultLink, Scheduler,
    SchedulerBuilder, SchedulerConfig, SchedulerState, SystemClock, TokioClock,
};
pub use error::{JobError, SchedulerError, TimerError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{
    BoxJobFuture, Discard, Job, JobContext, JobFn, JobOutput, JobRef, JobSpec, Outcome,
    OutcomeFn, OutcomeRef,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
