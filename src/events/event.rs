//! # Runtime events emitted by the scheduler, timer loops and dispatches.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: scheduler start, stop and kill
//! - **Registry events**: jobs registered / deregistered
//! - **Timer events**: next fire time computed, iteration errors, loop exit
//! - **Dispatch events**: execution started, succeeded, failed
//!
//! The [`Event`] struct carries metadata such as the job name, the fire instant,
//! the per-job dispatch counter and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use cronvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::JobFailed)
//!     .with_job("nightly-report")
//!     .with_dispatch(3)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::JobFailed);
//! assert_eq!(ev.job.as_deref(), Some("nightly-report"));
//! assert_eq!(ev.dispatch, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `job`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `job`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Lifecycle events ===
    /// `start()` spawned the timer loops.
    ///
    /// Sets:
    /// - `reason`: number of timer loops spawned
    SchedulerStarted,

    /// `stop()` signalled shutdown and started waiting.
    ShutdownRequested,

    /// Every timer loop and tracked dispatch finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; remaining timer loops were aborted.
    ///
    /// Sets:
    /// - `reason`: stuck job names
    GraceExceeded,

    /// `kill()` aborted the timer loops.
    SchedulerKilled,

    // === Registry events ===
    /// Job added to the registry.
    ///
    /// Sets:
    /// - `job`: job name
    JobRegistered,

    /// Job removed from the registry (its timer loop, if any, was cancelled).
    ///
    /// Sets:
    /// - `job`: job name
    JobDeregistered,

    // === Timer events ===
    /// Timer loop started for a job.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `fire_time`: cursor reference time
    TimerStarted,

    /// Next fire instant computed from the cursor.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `fire_time`: computed instant
    NextFireComputed,

    /// One timer iteration failed; the loop continues.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `reason`: error detail
    TimerError,

    /// The schedule has no further instants; the loop exits.
    ///
    /// Sets:
    /// - `job`: job name
    ScheduleExhausted,

    /// Timer loop exited (shutdown, deregistration or exhaustion).
    ///
    /// Sets:
    /// - `job`: job name
    TimerStopped,

    // === Dispatch events ===
    /// An execution was started.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `dispatch`: per-job dispatch counter
    /// - `fire_time`: scheduled instant (absent for the immediate run)
    JobDispatched,

    /// Execution finished with a value; `on_success` is being invoked.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `dispatch`: per-job dispatch counter
    JobSucceeded,

    /// Execution failed; `on_error` is being invoked.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `dispatch`: per-job dispatch counter
    /// - `reason`: error message
    JobFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the job (or subscriber), if applicable.
    pub job: Option<Arc<str>>,
    /// Fire instant on the scheduler clock.
    pub fire_time: Option<DateTime<Utc>>,
    /// Per-job dispatch counter (starting from 1).
    pub dispatch: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            fire_time: None,
            dispatch: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a job name.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a fire instant (ignored when `None`).
    #[inline]
    pub fn with_fire_time(mut self, at: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.fire_time = at.into();
        self
    }

    /// Attaches the per-job dispatch counter.
    #[inline]
    pub fn with_dispatch(mut self, n: u64) -> Self {
        self.dispatch = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_job(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_job(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Returns `true` for dispatch events (`JobDispatched`, `JobSucceeded`, `JobFailed`).
    #[inline]
    pub fn is_dispatch(&self) -> bool {
        matches!(
            self.kind,
            EventKind::JobDispatched | EventKind::JobSucceeded | EventKind::JobFailed
        )
    }
}
