//! Runtime core: scheduling, dispatch and lifecycle.
//!
//! The public surface of this module is [`Scheduler`] (plus its builder, config
//! and state), the [`CronCursor`], the [`Clock`] seam and the [`ResultLink`].
//!
//! Internal modules:
//! - [`timer`]: per-job polling loop computing and firing instants;
//! - [`dispatcher`]: spawns one execution and routes its outcome;
//! - [`registry`]: registered specs and timer handles;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod clock;
mod config;
pub(crate) mod cursor;
mod dispatcher;
mod link;
mod registry;
mod scheduler;
mod shutdown;
mod timer;

pub use builder::SchedulerBuilder;
pub use clock::{Clock, ClockRef, SystemClock, TokioClock};
pub use config::SchedulerConfig;
pub use cursor::CronCursor;
pub use link::{LinkOutcome, LinkPublisher, ResultLink};
pub use scheduler::{Scheduler, SchedulerState};
