//! # Outcome capability: where a finished execution is routed.
//!
//! Every [`JobSpec`](crate::JobSpec) carries an [`OutcomeRef`]. After a dispatch
//! completes, the dispatcher calls exactly one of its two methods:
//!
//! ```text
//! ResultLink ──► Ok(output) ──► on_success(&ctx, output)
//!            └─► Err(error) ──► on_error(&ctx, &error)
//! ```
//!
//! Return values do not exist at this boundary: callbacks are for the job's own
//! bookkeeping (metrics, alerting, persistence of results).
//!
//! A panic inside a callback is **not** caught. It terminates the detached
//! dispatch task only; the timer loop and the scheduler keep running.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::JobError;
use crate::jobs::context::JobContext;
use crate::jobs::job::JobOutput;

/// Shared handle to an outcome handler.
pub type OutcomeRef = Arc<dyn Outcome>;

/// Two-method capability receiving the result of each execution.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use cronvisor::{JobContext, JobError, JobOutput, Outcome};
///
/// struct Alert;
///
/// #[async_trait]
/// impl Outcome for Alert {
///     async fn on_success(&self, _ctx: &JobContext, _output: JobOutput) {}
///
///     async fn on_error(&self, ctx: &JobContext, err: &JobError) {
///         eprintln!("job {} run #{} failed: {err}", ctx.job(), ctx.seq());
///     }
/// }
/// ```
#[async_trait]
pub trait Outcome: Send + Sync + 'static {
    /// Called when the execution produced a value.
    async fn on_success(&self, ctx: &JobContext, output: JobOutput);

    /// Called when the execution failed, panicked or was abandoned.
    async fn on_error(&self, ctx: &JobContext, err: &JobError);
}

/// Outcome that ignores both results (default for new specs).
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

#[async_trait]
impl Outcome for Discard {
    async fn on_success(&self, _ctx: &JobContext, _output: JobOutput) {}

    async fn on_error(&self, _ctx: &JobContext, _err: &JobError) {}
}

/// Outcome backed by a pair of synchronous closures.
///
/// ```
/// use cronvisor::{JobContext, JobError, JobOutput, OutcomeFn, OutcomeRef};
///
/// let outcome: OutcomeRef = OutcomeFn::arc(
///     |ctx: &JobContext, out: JobOutput| println!("{} -> {out}", ctx.job()),
///     |ctx: &JobContext, err: &JobError| eprintln!("{} failed: {err}", ctx.job()),
/// );
/// # let _ = outcome;
/// ```
pub struct OutcomeFn<S, E> {
    success: S,
    error: E,
}

impl<S, E> OutcomeFn<S, E>
where
    S: Fn(&JobContext, JobOutput) + Send + Sync + 'static,
    E: Fn(&JobContext, &JobError) + Send + Sync + 'static,
{
    /// Creates an outcome from the two callbacks.
    pub fn new(success: S, error: E) -> Self {
        Self { success, error }
    }

    /// Creates the outcome and returns it as a shared handle.
    pub fn arc(success: S, error: E) -> Arc<Self> {
        Arc::new(Self::new(success, error))
    }
}

#[async_trait]
impl<S, E> Outcome for OutcomeFn<S, E>
where
    S: Fn(&JobContext, JobOutput) + Send + Sync + 'static,
    E: Fn(&JobContext, &JobError) + Send + Sync + 'static,
{
    async fn on_success(&self, ctx: &JobContext, output: JobOutput) {
        (self.success)(ctx, output)
    }

    async fn on_error(&self, ctx: &JobContext, err: &JobError) {
        (self.error)(ctx, err)
    }
}
