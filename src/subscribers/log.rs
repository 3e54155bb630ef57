//! # LogWriter: events as `tracing` records
//!
//! Installed by default by [`SchedulerBuilder`](crate::SchedulerBuilder). Every
//! event becomes one structured record; the host decides where records go by
//! installing a `tracing` subscriber.
//!
//! | Event               | Level |
//! |---------------------|-------|
//! | `NextFireComputed`  | debug |
//! | `JobDispatched`     | debug |
//! | `JobSucceeded`      | debug |
//! | `JobFailed`         | warn  |
//! | `TimerError`        | error |
//! | `GraceExceeded`     | error |
//! | subscriber problems | warn  |
//! | everything else     | info  |

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        if e.is_dispatch() {
            write_dispatch(e, job, reason);
            return;
        }
        match e.kind {
            EventKind::NextFireComputed => {
                tracing::debug!(job, next_run = ?e.fire_time, "next run computed");
            }
            EventKind::TimerError => {
                tracing::error!(job, error = reason, "unexpected error in timer loop");
            }
            EventKind::GraceExceeded => {
                tracing::error!(stuck = reason, "grace period exceeded, timer loops aborted");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = job, detail = reason, kind = ?e.kind, "subscriber problem");
            }
            EventKind::TimerStarted | EventKind::ScheduleExhausted | EventKind::TimerStopped => {
                tracing::info!(job, kind = ?e.kind, "timer");
            }
            EventKind::JobRegistered | EventKind::JobDeregistered => {
                tracing::info!(job, kind = ?e.kind, "registry");
            }
            EventKind::SchedulerStarted
            | EventKind::ShutdownRequested
            | EventKind::AllStoppedWithin
            | EventKind::SchedulerKilled => {
                tracing::info!(kind = ?e.kind, detail = reason, "scheduler");
            }
            EventKind::JobDispatched | EventKind::JobSucceeded | EventKind::JobFailed => {}
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

fn write_dispatch(e: &Event, job: &str, reason: &str) {
    match e.kind {
        EventKind::JobFailed => {
            tracing::warn!(job, dispatch = ?e.dispatch, error = reason, "job failed");
        }
        EventKind::JobSucceeded => {
            tracing::debug!(job, dispatch = ?e.dispatch, "job succeeded");
        }
        _ => {
            tracing::debug!(job, dispatch = ?e.dispatch, fire_time = ?e.fire_time, "job dispatched");
        }
    }
}
