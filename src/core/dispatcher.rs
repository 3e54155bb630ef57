//! # Dispatch one execution of a job and route its outcome.
//!
//! ```text
//! TimerLoop ── dispatch(spec, seq, fire_time) ──► returns immediately
//!                    │
//!                    └─► tracker.spawn(execute)                      (dispatch task)
//!                           ├─► ResultLink::channel(ctx)
//!                           ├─► tracker.spawn(job.run(ctx))          (execution unit)
//!                           ├─► tracker.spawn(link_results(unit))    (linking step)
//!                           │        └─ JoinHandle result ─► publisher.publish(..)
//!                           ├─► link.wait()                          (blocks this dispatch only)
//!                           └─► Ok  → JobSucceeded → outcome.on_success(ctx, output)
//!                               Err → JobFailed    → outcome.on_error(ctx, err)
//! ```
//!
//! ## Rules
//! - The timer loop never waits for an execution; executions of one job may overlap.
//! - The linking step publishes exactly once; a panicking or aborted execution
//!   unit becomes `JobError::Panicked` / `JobError::Canceled`.
//! - Callback panics are not caught here; they end the dispatch task and tokio
//!   keeps them away from the timer loop and the scheduler.
//! - Every spawned piece is tracked, so a graceful stop can wait for all of them.

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    core::{
        clock::ClockRef,
        link::{LinkOutcome, LinkPublisher, ResultLink},
    },
    error::{JobError, panic_message},
    events::{Bus, Event, EventKind},
    jobs::{JobContext, JobOutput, JobSpec},
};

/// Starts executions and routes their outcomes.
///
/// Cheap to clone; all clones share the tracker and the kill token.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    bus: Bus,
    clock: ClockRef,
    tracker: TaskTracker,
    kill: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        bus: Bus,
        clock: ClockRef,
        tracker: TaskTracker,
        kill: CancellationToken,
    ) -> Self {
        Self {
            bus,
            clock,
            tracker,
            kill,
        }
    }

    /// Starts one execution of `spec` without waiting for it.
    pub(crate) fn dispatch(&self, spec: &JobSpec, seq: u64, fire_time: Option<DateTime<Utc>>) {
        let ctx = JobContext::new(
            spec.shared_name(),
            seq,
            fire_time,
            self.clock.now(),
            self.kill.clone(),
        );
        self.bus.publish(
            Event::new(EventKind::JobDispatched)
                .with_job(spec.shared_name())
                .with_dispatch(seq)
                .with_fire_time(fire_time),
        );

        let me = self.clone();
        let spec = spec.clone();
        self.tracker.spawn(async move { me.execute(spec, ctx).await });
    }

    /// Runs one execution to completion and hands the outcome to the job's [`Outcome`](crate::Outcome).
    async fn execute(&self, spec: JobSpec, ctx: JobContext) {
        let (publisher, link) = ResultLink::channel(ctx.clone());
        let unit = self.tracker.spawn(spec.job().run(ctx));
        self.tracker.spawn(link_results(unit, publisher));

        let LinkOutcome { context, result } = link.wait().await;
        match result {
            Ok(output) => {
                self.bus.publish(
                    Event::new(EventKind::JobSucceeded)
                        .with_job(spec.shared_name())
                        .with_dispatch(context.seq()),
                );
                spec.outcome().on_success(&context, output).await;
            }
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::JobFailed)
                        .with_job(spec.shared_name())
                        .with_dispatch(context.seq())
                        .with_reason(err.to_string()),
                );
                spec.outcome().on_error(&context, &err).await;
            }
        }
    }
}

/// Waits for the execution unit and publishes its result, whatever happened to it.
async fn link_results(unit: JoinHandle<Result<JobOutput, JobError>>, publisher: LinkPublisher) {
    let result = match unit.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(JobError::Panicked {
            info: panic_message(e.into_panic().as_ref()),
        }),
        Err(_) => Err(JobError::Canceled),
    };
    publisher.publish(result);
}
