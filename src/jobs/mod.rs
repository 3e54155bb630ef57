//! # Job abstractions and specifications.
//!
//! This module provides the job-related types:
//! - [`Job`] - trait for a named handler producing one future per dispatch
//! - [`JobFn`] - function-based job implementation
//! - [`JobRef`] - shared reference to a job (`Arc<dyn Job>`)
//! - [`JobSpec`] - specification bundling a job with its schedule and outcome
//! - [`Outcome`] - on-success / on-error capability
//! - [`JobContext`] - per-dispatch metadata

mod context;
mod job;
mod job_fn;
mod outcome;
mod spec;

pub use context::JobContext;
pub use job::{BoxJobFuture, Job, JobOutput, JobRef};
pub use job_fn::JobFn;
pub use outcome::{Discard, Outcome, OutcomeFn, OutcomeRef};
pub use spec::JobSpec;
