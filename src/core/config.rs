//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the scheduler runtime.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::builder(config)`
//! 2. **JobSpec defaults**: `JobSpec::with_defaults(job, expr, &config)`
//!
//! Loading the values (files, env) is the host's business; the struct is plain data.

use std::time::Duration;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `poll_interval`: how long a timer loop sleeps between fire checks (precision/CPU trade-off)
/// - `grace`: maximum wait in `stop()` for timer loops and in-flight dispatches
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `fire_immediately`: default for [`JobSpec::with_defaults`](crate::JobSpec::with_defaults)
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Sleep between two fire checks of a timer loop.
    ///
    /// `0` is clamped to 1ms so an idle loop never spins.
    pub poll_interval: Duration,

    /// Maximum time `stop()` waits before aborting the remaining timer loops.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default "dispatch once on timer start" flag for jobs built from this config.
    pub fire_immediately: bool,
}

impl SchedulerConfig {
    /// Returns the poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `poll_interval = 5ms`
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `fire_immediately = false`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            fire_immediately: false,
        }
    }
}
