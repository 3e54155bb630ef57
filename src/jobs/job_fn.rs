//! # Function-backed job (`JobFn`)
//!
//! [`JobFn`] wraps a closure `F: Fn(JobContext) -> Fut`, producing a fresh
//! future per dispatch. No state is shared between executions unless the closure
//! captures it explicitly (e.g. an `Arc<AtomicU64>` counter).
//!
//! ## Example
//! ```rust
//! use cronvisor::{JobContext, JobFn, JobRef};
//!
//! let j: JobRef = JobFn::arc("report", |ctx: JobContext| async move {
//!     Ok(serde_json::json!(ctx.seq()))
//! });
//!
//! assert_eq!(j.name(), "report");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::JobError;
use crate::jobs::context::JobContext;
use crate::jobs::job::{BoxJobFuture, Job, JobOutput};

/// Function-backed job implementation.
///
/// Wraps a closure that *creates* a new future per dispatch.
pub struct JobFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> JobFn<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobOutput, JobError>> + Send + 'static,
{
    /// Creates a new function-backed job.
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`](crate::JobRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Job for JobFn<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobOutput, JobError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: JobContext) -> BoxJobFuture {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_util::sync::CancellationToken;

    fn ctx(seq: u64) -> JobContext {
        JobContext::new("probe".into(), seq, None, Utc::now(), CancellationToken::new())
    }

    #[tokio::test]
    async fn each_run_builds_a_fresh_future() {
        let job = JobFn::new("probe", |ctx: JobContext| async move {
            Ok(serde_json::json!(ctx.seq() * 10))
        });
        assert_eq!(job.run(ctx(1)).await, Ok(serde_json::json!(10)));
        assert_eq!(job.run(ctx(2)).await, Ok(serde_json::json!(20)));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let job = JobFn::new("probe", |_ctx: JobContext| async move {
            Err(JobError::fail("db down"))
        });
        assert_eq!(job.run(ctx(1)).await, Err(JobError::fail("db down")));
    }
}
