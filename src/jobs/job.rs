//! # Job abstraction.
//!
//! This module defines the [`Job`] trait: a named handler producing one boxed
//! future per dispatch. The common handle type is [`JobRef`], an `Arc<dyn Job>`
//! suitable for sharing between the registry, timer loops and dispatches.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::error::JobError;
use crate::jobs::context::JobContext;

/// Success payload of a job execution.
pub type JobOutput = serde_json::Value;

/// Boxed future returned by [`Job::run`].
pub type BoxJobFuture = Pin<Box<dyn Future<Output = Result<JobOutput, JobError>> + Send + 'static>>;

/// Shared handle to a job handler.
pub type JobRef = Arc<dyn Job>;

/// # Unit of scheduled work.
///
/// Every dispatch calls [`run`](Job::run) once with a fresh [`JobContext`]; the
/// returned future is spawned as a detached execution. Executions of the same
/// job may overlap when a run outlasts the interval between fire times.
///
/// # Example
/// ```
/// use cronvisor::{BoxJobFuture, Job, JobContext};
///
/// struct Heartbeat;
///
/// impl Job for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     fn run(&self, ctx: JobContext) -> BoxJobFuture {
///         Box::pin(async move { Ok(serde_json::json!({ "seq": ctx.seq() })) })
///     }
/// }
/// ```
pub trait Job: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Creates the future for one execution.
    fn run(&self, ctx: JobContext) -> BoxJobFuture;
}
