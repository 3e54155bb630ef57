//! # Time source for timer loops.
//!
//! Timer loops never call `Utc::now()` directly; they ask a [`Clock`]. Production
//! code uses [`SystemClock`]. [`TokioClock`] maps tokio's (pausable) monotonic
//! clock onto a wall-clock anchor so that `tokio::time::pause` / `advance`
//! drives cron schedules in simulations and tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Shared handle to a clock.
pub type ClockRef = Arc<dyn Clock>;

/// Source of the current wall-clock instant.
pub trait Clock: Send + Sync + 'static {
    /// Returns "now".
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of the host (`Utc::now`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock derived from tokio's monotonic clock.
///
/// `now()` is `anchor + (tokio::time::Instant::now() - origin)`; with a paused
/// runtime it only moves when tokio time advances.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use cronvisor::{Clock, TokioClock};
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let clock = TokioClock::anchored(t0);
/// tokio::time::advance(std::time::Duration::from_millis(1500)).await;
/// assert_eq!(clock.now(), t0 + chrono::Duration::milliseconds(1500));
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor: DateTime<Utc>,
    origin: Instant,
}

impl TokioClock {
    /// Creates a clock reading `anchor` right now.
    pub fn anchored(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}
