//! # SchedulerBuilder: assembles a scheduler with its bus and subscribers.
//!
//! ```text
//! build():
//!   ├─► Bus::new(bus_capacity)
//!   ├─► [LogWriter] + user subscribers → SubscriberSet
//!   ├─► spawn listener: bus → SubscriberSet (until the scheduler is dropped)
//!   └─► Arc<Scheduler>
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{
    clock::{ClockRef, SystemClock},
    config::SchedulerConfig,
    scheduler::Scheduler,
};
use crate::{
    events::Bus,
    subscribers::{LogWriter, Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Scheduler`].
///
/// ```rust
/// use std::sync::Arc;
/// use cronvisor::{SchedulerBuilder, SchedulerConfig, SystemClock};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sched = SchedulerBuilder::new(SchedulerConfig::default())
///     .with_clock(Arc::new(SystemClock))
///     .without_log_writer()
///     .build();
/// assert!(sched.jobs().await.is_empty());
/// # }
/// ```
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    clock: ClockRef,
    log_writer: bool,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            clock: Arc::new(SystemClock),
            log_writer: true,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (timer and dispatch activity, lifecycle)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the wall clock used by timer loops (default: [`SystemClock`]).
    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = clock;
        self
    }

    /// Does not install the built-in [`LogWriter`] subscriber.
    pub fn without_log_writer(mut self) -> Self {
        self.log_writer = false;
        self
    }

    /// Builds the scheduler.
    ///
    /// Must be called inside a tokio runtime: subscriber workers and the bus
    /// listener are spawned here. They run until the scheduler is dropped.
    pub fn build(self) -> Arc<Scheduler> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = CancellationToken::new();

        let mut subscribers = self.subscribers;
        if self.log_writer {
            subscribers.insert(0, Arc::new(LogWriter::new()));
        }
        if !subscribers.is_empty() {
            let set = SubscriberSet::new(subscribers, bus.clone());
            spawn_listener(&bus, set, listener.clone());
        }

        Arc::new(Scheduler::new_internal(self.cfg, bus, self.clock, listener))
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
fn spawn_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::TokioClock;
    use crate::events::{Event, EventKind};
    use crate::jobs::{JobContext, JobFn, JobSpec};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_scheduler_events() {
        let kinds = Arc::new(Kinds::default());
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let sched = SchedulerBuilder::new(SchedulerConfig::default())
            .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
            .with_clock(Arc::new(TokioClock::anchored(t0)))
            .build();

        let job = JobFn::arc("observed", |_ctx: JobContext| async move {
            Ok(serde_json::Value::Null)
        });
        sched
            .register(JobSpec::new(job, "* * * * * *").unwrap())
            .await
            .unwrap();
        sched.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        sched.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let seen = kinds.0.lock().unwrap().clone();
        for kind in [
            EventKind::JobRegistered,
            EventKind::SchedulerStarted,
            EventKind::TimerStarted,
            EventKind::NextFireComputed,
            EventKind::JobDispatched,
            EventKind::JobSucceeded,
            EventKind::ShutdownRequested,
            EventKind::TimerStopped,
            EventKind::AllStoppedWithin,
        ] {
            assert!(seen.contains(&kind), "missing {kind:?} in {seen:?}");
        }
    }
}
