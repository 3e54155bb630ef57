//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing the scheduler: metrics,
//! audit trails, alerting. Each subscriber gets its own worker and bounded queue
//! inside the [`SubscriberSet`](crate::SubscriberSet), so a slow subscriber
//! never delays a timer loop.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// ```rust
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use async_trait::async_trait;
/// use cronvisor::{Event, EventKind, Subscribe};
///
/// #[derive(Default)]
/// struct FailureCounter(AtomicU64);
///
/// #[async_trait]
/// impl Subscribe for FailureCounter {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::JobFailed {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
///     fn name(&self) -> &'static str { "failure-counter" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for overflow/panic reports).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue; overflowing events are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
