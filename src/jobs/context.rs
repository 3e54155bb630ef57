//! # Per-dispatch execution context.
//!
//! A fresh [`JobContext`] is built for every dispatch and handed to the job handler
//! and, once the execution finished, to the [`Outcome`](crate::Outcome) callbacks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Metadata describing one dispatch of a job.
///
/// Cheap to clone (name and token are reference counted).
#[derive(Clone, Debug)]
pub struct JobContext {
    job: Arc<str>,
    seq: u64,
    fire_time: Option<DateTime<Utc>>,
    dispatched_at: DateTime<Utc>,
    kill: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(
        job: Arc<str>,
        seq: u64,
        fire_time: Option<DateTime<Utc>>,
        dispatched_at: DateTime<Utc>,
        kill: CancellationToken,
    ) -> Self {
        Self {
            job,
            seq,
            fire_time,
            dispatched_at,
            kill,
        }
    }

    /// Name of the dispatched job.
    pub fn job(&self) -> &str {
        &self.job
    }

    /// Per-job dispatch counter (1-based, increases by one per dispatch).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Scheduled instant that triggered this dispatch.
    ///
    /// `None` for the immediate dispatch of a job registered with `fire_immediately`.
    pub fn fire_time(&self) -> Option<DateTime<Utc>> {
        self.fire_time
    }

    /// Instant (on the scheduler clock) at which the dispatch was issued.
    pub fn dispatched_at(&self) -> DateTime<Utc> {
        self.dispatched_at
    }

    /// Returns `true` once the scheduler has been killed.
    ///
    /// Killed executions are not awaited by anyone; long handlers may poll this
    /// (or await [`JobContext::killed`]) to give up early.
    pub fn is_killed(&self) -> bool {
        self.kill.is_cancelled()
    }

    /// Completes when the scheduler is killed.
    pub async fn killed(&self) {
        self.kill.cancelled().await
    }
}
