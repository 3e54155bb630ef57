//! Error types used by the cronvisor runtime and jobs.
//!
//! This module defines three error enums:
//!
//! - [`SchedulerError`] errors returned to callers of the [`Scheduler`](crate::Scheduler) API.
//! - [`JobError`] the failure half of a job execution outcome, delivered to
//!   [`Outcome::on_error`](crate::Outcome::on_error).
//! - [`TimerError`] a failure inside one polling iteration of a timer loop; it is
//!   reported through the event bus and never stops the loop.
//!
//! All types provide `as_label` (stable snake_case label for logs/metrics).

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::core::SchedulerState;

/// # Errors produced by the scheduler API.
///
/// These represent misuse or misconfiguration (bad cron expression, unknown job,
/// invalid lifecycle transition) and failures observed while shutting down.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidExpression {
        /// Expression as supplied by the caller.
        expression: String,
        /// Parser message.
        reason: String,
    },

    /// A job with the same name is already registered.
    #[error("job {name:?} is already registered")]
    DuplicateJob {
        /// Name of the conflicting job.
        name: String,
    },

    /// No job with this name is registered.
    #[error("job {name:?} is not registered")]
    JobNotFound {
        /// Requested job name.
        name: String,
    },

    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {op} scheduler in state {state:?}")]
    InvalidState {
        /// Rejected operation (`start`, `stop`, `register`, ...).
        op: &'static str,
        /// State observed when the operation was attempted.
        state: SchedulerState,
    },

    /// Graceful stop did not finish within the grace period; remaining timer loops were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Jobs whose timer loops had not exited in time, plus an
        /// `"N in-flight dispatches"` entry when executions were still running.
        stuck: Vec<String>,
    },

    /// OS signal listeners could not be installed by `run_until_signal`.
    #[error("cannot listen for shutdown signals: {reason}")]
    SignalUnavailable {
        /// I/O error reported by the signal driver.
        reason: String,
    },

    /// A timer loop terminated with a panic that escaped its iteration guard.
    #[error("timer loop for job {job:?} panicked: {info}")]
    TimerPanicked {
        /// Job owning the timer loop.
        job: String,
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cronvisor::SchedulerError;
    /// use std::time::Duration;
    ///
    /// let err = SchedulerError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "scheduler_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::InvalidExpression { .. } => "scheduler_invalid_expression",
            SchedulerError::DuplicateJob { .. } => "scheduler_duplicate_job",
            SchedulerError::JobNotFound { .. } => "scheduler_job_not_found",
            SchedulerError::InvalidState { .. } => "scheduler_invalid_state",
            SchedulerError::GraceExceeded { .. } => "scheduler_grace_exceeded",
            SchedulerError::TimerPanicked { .. } => "scheduler_timer_panicked",
            SchedulerError::SignalUnavailable { .. } => "scheduler_signal_unavailable",
        }
    }

    /// Returns `true` for errors raised while building or registering a job.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidExpression { .. } | SchedulerError::DuplicateJob { .. }
        )
    }
}

/// # Errors produced by a job execution.
///
/// Exactly one of these (or a success value) is published per dispatch.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The handler returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The handler panicked.
    #[error("execution panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The execution unit was aborted before it produced an outcome.
    #[error("execution cancelled")]
    Canceled,

    /// The execution unit went away without publishing an outcome.
    #[error("execution abandoned without an outcome")]
    Abandoned,
}

impl JobError {
    /// Convenience constructor for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cronvisor::JobError;
    ///
    /// assert_eq!(JobError::fail("boom").as_label(), "job_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Panicked { .. } => "job_panicked",
            JobError::Canceled => "job_canceled",
            JobError::Abandoned => "job_abandoned",
        }
    }
}

/// # Failure inside one timer loop iteration.
///
/// Reported as [`EventKind::TimerError`](crate::EventKind::TimerError); the loop keeps running.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The iteration panicked (clock, cursor or dispatch path).
    #[error("timer iteration panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TimerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TimerError::Panicked { .. } => "timer_panicked",
        }
    }
}

/// Renders a panic payload (`&'static str` or `String`) as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = SchedulerError::InvalidState {
            op: "start",
            state: SchedulerState::Stopped,
        };
        assert_eq!(err.as_label(), "scheduler_invalid_state");
        assert!(!err.is_configuration());
        assert_eq!(JobError::Canceled.as_label(), "job_canceled");
        assert_eq!(
            TimerError::Panicked { info: "x".into() }.as_label(),
            "timer_panicked"
        );
    }

    #[test]
    fn panic_message_downcasts_common_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn invalid_expression_is_configuration_error() {
        let err = SchedulerError::InvalidExpression {
            expression: "nope".into(),
            reason: "bad".into(),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("nope"));
    }
}
