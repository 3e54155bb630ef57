//! # TimerLoop: per-job polling loop.
//!
//! Owns the job's [`CronCursor`] and its pending `next_fire_time`, and hands
//! every due instant to the [`Dispatcher`].
//!
//! ## Event flow
//! ```text
//! TimerStarted → [JobDispatched (immediate run)]
//!             → NextFireComputed → ... → JobDispatched → NextFireComputed → ...
//!             → TimerStopped                      (shutdown / deregister)
//!             → ScheduleExhausted → TimerStopped  (no further instants)
//! ```
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► shutdown cancelled?          → exit (Shutdown)
//!   ├─► tick() under catch_unwind
//!   │     ├─► next unset → cursor.next() → publish NextFireComputed
//!   │     │                 └─ None     → exit (Exhausted)
//!   │     └─► now ≥ next → dispatch(seq, next), unset next, skip cursor past now
//!   │   panic → publish TimerError, keep looping
//!   └─► select! { sleep(poll_interval), shutdown.cancelled() }
//! }
//! ```
//!
//! ## Rules
//! - At most one dispatch per iteration; missed instants are coalesced, never replayed.
//! - The loop never awaits an execution.
//! - Dispatch sequence numbers start at 1 and include the immediate run.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{clock::ClockRef, cursor::CronCursor, dispatcher::Dispatcher},
    error::{TimerError, panic_message},
    events::{Bus, Event, EventKind},
    jobs::JobSpec,
};

/// Why a timer loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerExit {
    /// The shutdown token was cancelled.
    Shutdown,
    /// The schedule has no further instants.
    Exhausted,
}

enum Tick {
    Idle,
    Fired,
    Exhausted,
}

/// Polling loop driving one job's schedule.
pub(crate) struct TimerLoop {
    spec: JobSpec,
    clock: ClockRef,
    poll_interval: Duration,
    bus: Bus,
    dispatcher: Dispatcher,
}

/// Mutable loop state, touched only from inside one iteration.
struct Pending {
    cursor: CronCursor,
    next: Option<DateTime<Utc>>,
    seq: u64,
}

impl TimerLoop {
    pub(crate) fn new(
        spec: JobSpec,
        clock: ClockRef,
        poll_interval: Duration,
        bus: Bus,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            spec,
            clock,
            poll_interval,
            bus,
            dispatcher,
        }
    }

    /// Runs until `shutdown` is cancelled or the schedule is exhausted.
    ///
    /// Cancellation is observed at the top of every iteration and during the
    /// poll sleep, so the loop exits within one poll interval.
    pub(crate) async fn run(self, shutdown: CancellationToken) -> TimerExit {
        let name = self.spec.shared_name();
        let reference = self
            .spec
            .reference_time()
            .unwrap_or_else(|| self.clock.now());
        let mut pending = Pending {
            cursor: CronCursor::new(self.spec.schedule().clone(), reference),
            next: None,
            seq: 0,
        };
        self.bus.publish(
            Event::new(EventKind::TimerStarted)
                .with_job(name.clone())
                .with_fire_time(reference),
        );

        if self.spec.fire_immediately() && !shutdown.is_cancelled() {
            pending.seq += 1;
            self.dispatcher.dispatch(&self.spec, pending.seq, None);
        }

        let exit = loop {
            if shutdown.is_cancelled() {
                break TimerExit::Shutdown;
            }
            match self.tick(&mut pending) {
                Ok(Tick::Idle | Tick::Fired) => {}
                Ok(Tick::Exhausted) => {
                    self.bus
                        .publish(Event::new(EventKind::ScheduleExhausted).with_job(name.clone()));
                    break TimerExit::Exhausted;
                }
                Err(err) => {
                    self.bus.publish(
                        Event::new(EventKind::TimerError)
                            .with_job(name.clone())
                            .with_reason(err.to_string()),
                    );
                }
            }

            select! {
                _ = shutdown.cancelled() => break TimerExit::Shutdown,
                _ = time::sleep(self.poll_interval) => {}
            }
        };

        self.bus
            .publish(Event::new(EventKind::TimerStopped).with_job(name));
        exit
    }

    /// One fire check. A panic anywhere in it becomes a [`TimerError`].
    fn tick(&self, pending: &mut Pending) -> Result<Tick, TimerError> {
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            let due = match pending.next {
                Some(at) => at,
                None => {
                    let Some(at) = pending.cursor.next() else {
                        return Tick::Exhausted;
                    };
                    pending.next = Some(at);
                    self.bus.publish(
                        Event::new(EventKind::NextFireComputed)
                            .with_job(self.spec.shared_name())
                            .with_fire_time(at),
                    );
                    at
                }
            };

            let now = self.clock.now();
            if now < due {
                return Tick::Idle;
            }
            pending.next = None;
            pending.cursor.skip_past(now);
            pending.seq += 1;
            self.dispatcher.dispatch(&self.spec, pending.seq, Some(due));
            Tick::Fired
        }))
        .map_err(|payload| TimerError::Panicked {
            info: panic_message(payload.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::{Clock, TokioClock};
    use crate::jobs::{JobContext, JobFn};
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::broadcast;
    use tokio_util::task::TaskTracker;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(n)
    }

    fn every_second() -> JobSpec {
        let job = JobFn::arc("tick", |_ctx: JobContext| async move {
            Ok(serde_json::Value::Null)
        });
        JobSpec::new(job, "* * * * * *")
            .unwrap()
            .with_reference_time(t0())
    }

    fn timer(spec: JobSpec, clock: ClockRef, bus: &Bus) -> TimerLoop {
        let dispatcher = Dispatcher::new(
            bus.clone(),
            clock.clone(),
            TaskTracker::new(),
            CancellationToken::new(),
        );
        TimerLoop::new(spec, clock, Duration::from_millis(5), bus.clone(), dispatcher)
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn dispatches(events: &[Event]) -> Vec<(Option<u64>, Option<DateTime<Utc>>)> {
        events
            .iter()
            .filter(|e| e.kind == EventKind::JobDispatched)
            .map(|e| (e.dispatch, e.fire_time))
            .collect()
    }

    /// Panics on the n-th call, then behaves like the wrapped clock.
    struct FlakyClock {
        inner: TokioClock,
        calls: AtomicU32,
        panic_on: u32,
    }

    impl Clock for FlakyClock {
        fn now(&self) -> DateTime<Utc> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.panic_on {
                panic!("clock source unavailable");
            }
            self.inner.now()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_run_does_not_shift_the_schedule() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let clock: ClockRef = Arc::new(TokioClock::anchored(t0()));
        let spec = every_second().with_fire_immediately(true);

        let token = CancellationToken::new();
        let handle = tokio::spawn(timer(spec, clock, &bus).run(token.clone()));

        time::sleep(Duration::from_millis(2_500)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), TimerExit::Shutdown);

        let events = drain(&mut rx);
        assert_eq!(
            dispatches(&events),
            vec![
                (Some(1), None),
                (Some(2), Some(secs(1))),
                (Some(3), Some(secs(2))),
            ]
        );
        assert_eq!(events.first().map(|e| e.kind), Some(EventKind::TimerStarted));
        assert_eq!(events.last().map(|e| e.kind), Some(EventKind::TimerStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_iteration_is_reported_and_the_loop_continues() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let clock: ClockRef = Arc::new(FlakyClock {
            inner: TokioClock::anchored(t0()),
            calls: AtomicU32::new(0),
            panic_on: 1,
        });

        let token = CancellationToken::new();
        let handle = tokio::spawn(timer(every_second(), clock, &bus).run(token.clone()));

        time::sleep(Duration::from_millis(2_500)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), TimerExit::Shutdown);

        let events = drain(&mut rx);
        let errors: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::TimerError)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(
            errors[0]
                .reason
                .as_deref()
                .is_some_and(|r| r.contains("clock source unavailable"))
        );
        assert_eq!(
            dispatches(&events),
            vec![(Some(1), Some(secs(1))), (Some(2), Some(secs(2)))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_loop_coalesces_missed_instants() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        // Instants t0+1..t0+10 are all overdue when the loop starts.
        let late = secs(10) + chrono::Duration::milliseconds(500);
        let clock: ClockRef = Arc::new(TokioClock::anchored(late));

        let token = CancellationToken::new();
        let handle = tokio::spawn(timer(every_second(), clock, &bus).run(token.clone()));

        time::sleep(Duration::from_millis(300)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(dispatches(&drain(&mut rx)), vec![(Some(1), Some(secs(1)))]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_schedule_ends_the_loop() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let clock: ClockRef = Arc::new(TokioClock::anchored(t0()));
        let job = JobFn::arc("past", |_ctx: JobContext| async move {
            Ok(serde_json::Value::Null)
        });
        let spec = JobSpec::new(job, "0 0 0 1 1 * 2020")
            .unwrap()
            .with_reference_time(t0());

        let exit = timer(spec, clock, &bus)
            .run(CancellationToken::new())
            .await;
        assert_eq!(exit, TimerExit::Exhausted);

        let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TimerStarted,
                EventKind::ScheduleExhausted,
                EventKind::TimerStopped
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_exits_without_dispatching() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let clock: ClockRef = Arc::new(TokioClock::anchored(t0()));
        let token = CancellationToken::new();
        token.cancel();

        let exit = timer(every_second().with_fire_immediately(true), clock, &bus)
            .run(token)
            .await;
        assert_eq!(exit, TimerExit::Shutdown);
        assert!(dispatches(&drain(&mut rx)).is_empty());
    }
}
