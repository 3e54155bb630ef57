//! # Event subscribers.
//!
//! ```text
//! Bus ──► scheduler listener ──► SubscriberSet::emit(event)
//!                                   ├──► LogWriter (tracing records)
//!                                   └──► user subscribers (metrics, alerts, ...)
//! ```
//!
//! Implement [`Subscribe`] to observe timer and dispatch activity without touching
//! job handlers.

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
