//! # Job specification for scheduled execution.
//!
//! Defines [`JobSpec`] a bundle describing *what* runs ([`JobRef`]), *when*
//! (cron expression, reference time, immediate first run) and *where the result
//! goes* ([`OutcomeRef`]).
//!
//! A spec can be created:
//! - **Explicitly** with [`JobSpec::new`] and the `with_*` builders
//! - **From config** with [`JobSpec::with_defaults`] (inherit scheduler defaults)
//!
//! ## Rules
//! - The expression is parsed here; an invalid expression never reaches the scheduler.
//! - The spec is immutable once registered (clones share the handler and outcome).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::{
    core::{SchedulerConfig, cursor},
    error::SchedulerError,
    jobs::job::JobRef,
    jobs::outcome::{Discard, OutcomeRef},
};

/// Specification for running a job on a cron schedule.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use cronvisor::{JobContext, JobFn, JobRef, JobSpec};
///
/// let tick: JobRef = JobFn::arc("tick", |_ctx: JobContext| async move {
///     Ok(serde_json::Value::Null)
/// });
///
/// let spec = JobSpec::new(tick, "*/5 * * * *")
///     .unwrap()
///     .with_reference_time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
///     .with_fire_immediately(true);
///
/// assert_eq!(spec.name(), "tick");
/// assert!(spec.fire_immediately());
/// assert!(JobSpec::new(spec.job().clone(), "not a cron line").is_err());
/// ```
#[derive(Clone)]
pub struct JobSpec {
    job: JobRef,
    name: Arc<str>,
    expression: String,
    schedule: Schedule,
    reference_time: Option<DateTime<Utc>>,
    fire_immediately: bool,
    outcome: OutcomeRef,
}

impl JobSpec {
    /// Creates a specification, parsing `expression`.
    ///
    /// Accepts 5-field (`min hour dom month dow`), 6-field (leading seconds) and
    /// 7-field (trailing year) expressions.
    ///
    /// ### Errors
    /// [`SchedulerError::InvalidExpression`] if the expression cannot be parsed.
    pub fn new(job: JobRef, expression: impl Into<String>) -> Result<Self, SchedulerError> {
        let expression = expression.into();
        let schedule = cursor::parse(&expression)?;
        Ok(Self {
            name: Arc::from(job.name()),
            job,
            expression,
            schedule,
            reference_time: None,
            fire_immediately: false,
            outcome: Arc::new(Discard),
        })
    }

    /// Creates a specification inheriting job defaults from the scheduler config.
    pub fn with_defaults(
        job: JobRef,
        expression: impl Into<String>,
        cfg: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        Ok(Self::new(job, expression)?.with_fire_immediately(cfg.fire_immediately))
    }

    /// Returns the job handler.
    pub fn job(&self) -> &JobRef {
        &self.job
    }

    /// Returns the job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the expression as supplied.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub(crate) fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Returns the explicit cursor starting point, if any.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time
    }

    /// Returns whether one execution is dispatched as soon as the timer loop starts.
    pub fn fire_immediately(&self) -> bool {
        self.fire_immediately
    }

    /// Returns the outcome handler.
    pub fn outcome(&self) -> &OutcomeRef {
        &self.outcome
    }

    /// Returns a new spec with the given cursor starting point.
    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// Returns a new spec with the immediate-run flag set.
    pub fn with_fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }

    /// Returns a new spec routing results to `outcome`.
    pub fn with_outcome(mut self, outcome: OutcomeRef) -> Self {
        self.outcome = outcome;
        self
    }
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("expression", &self.expression)
            .field("reference_time", &self.reference_time)
            .field("fire_immediately", &self.fire_immediately)
            .finish_non_exhaustive()
    }
}
