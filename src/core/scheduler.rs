//! # Scheduler: registry of cron jobs, timer loops and lifecycle.
//!
//! The [`Scheduler`] owns the event bus, the job registry, one [`TimerLoop`] per
//! registered job, and the tracker every dispatch is spawned on.
//!
//! ## Lifecycle
//! ```text
//!             start()               stop()                 (all exited within grace)
//! Created ──────────► Started ──────────► Stopping ───────────────────────► Stopped
//!    │                   │                    │
//!    │ stop()            │ kill()             └── grace exceeded ──► Killed
//!    ├──────► Stopped    └──────► Killed
//!    │ kill()
//!    └──────► Killed
//! ```
//!
//! ## Shutdown paths
//! ```text
//! stop():
//!   ├─► publish ShutdownRequested
//!   ├─► shutdown.cancel()                 → every timer loop exits within one poll
//!   └─► timeout(grace):
//!          ├─ join every timer loop       (cancellation swallowed, panic → TimerPanicked)
//!          ├─ tracker.close(); tracker.wait()   (in-flight dispatches finish)
//!          ├─ Ok      → AllStoppedWithin, Stopped
//!          └─ Timeout → abort loops, kill.cancel(), GraceExceeded, Killed
//!
//! kill():
//!   ├─► kill.cancel(), shutdown.cancel()  → handlers observing the kill token may give up
//!   ├─► abort + join every timer loop
//!   └─► return; in-flight executions finish (or not) in the background
//! ```
//!
//! ## Rules
//! - Locks are always taken in the order state → registry.
//! - Dispatches are started only by timer loops; `stop()` joins every loop before
//!   waiting on the tracker, so nothing is dispatched after `stop()` returns.
//! - Registering while `Started` spawns the job's timer loop immediately.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::AbortHandle;
use tokio::time;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    core::{
        builder::SchedulerBuilder,
        clock::ClockRef,
        config::SchedulerConfig,
        dispatcher::Dispatcher,
        registry::{Registry, TimerHandle},
        shutdown,
        timer::TimerLoop,
    },
    error::SchedulerError,
    events::{Bus, Event, EventKind},
    jobs::JobSpec,
};

/// Lifecycle state of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Built, accepting registrations, no timer loop running.
    Created,
    /// Timer loops running.
    Started,
    /// `stop()` in progress.
    Stopping,
    /// Gracefully stopped; terminal.
    Stopped,
    /// Killed, or stopped past the grace period; terminal.
    Killed,
}

/// Cron job scheduler.
///
/// Built with [`Scheduler::builder`]; shared as `Arc<Scheduler>`.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use cronvisor::{JobContext, JobFn, JobSpec, Scheduler, SchedulerConfig, SchedulerState};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> Result<(), cronvisor::SchedulerError> {
///     let sched = Scheduler::builder(SchedulerConfig::default()).build();
///
///     let job = JobFn::arc("heartbeat", |ctx: JobContext| async move {
///         Ok(serde_json::json!({ "beat": ctx.seq() }))
///     });
///     sched.register(JobSpec::new(job, "*/10 * * * * *")?).await?;
///
///     sched.start().await?;
///     tokio::time::sleep(Duration::from_secs(30)).await;
///     sched.stop().await?;
///
///     assert_eq!(sched.state().await, SchedulerState::Stopped);
///     Ok(())
/// }
/// ```
pub struct Scheduler {
    cfg: SchedulerConfig,
    bus: Bus,
    clock: ClockRef,
    state: Mutex<SchedulerState>,
    registry: Mutex<Registry>,
    shutdown: CancellationToken,
    kill: CancellationToken,
    tracker: TaskTracker,
    dispatcher: Dispatcher,
    listener: CancellationToken,
}

impl Scheduler {
    /// Returns a builder for a scheduler with the given configuration.
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Creates a scheduler from parts prepared by the builder.
    pub(crate) fn new_internal(
        cfg: SchedulerConfig,
        bus: Bus,
        clock: ClockRef,
        listener: CancellationToken,
    ) -> Self {
        let kill = CancellationToken::new();
        let tracker = TaskTracker::new();
        let dispatcher = Dispatcher::new(bus.clone(), clock.clone(), tracker.clone(), kill.clone());
        Self {
            cfg,
            bus,
            clock,
            state: Mutex::new(SchedulerState::Created),
            registry: Mutex::new(Registry::new()),
            shutdown: CancellationToken::new(),
            kill,
            tracker,
            dispatcher,
            listener,
        }
    }

    /// Registers a job.
    ///
    /// ### Errors
    /// - [`SchedulerError::DuplicateJob`] if the name is taken
    /// - [`SchedulerError::InvalidState`] once the scheduler is stopping or terminal
    pub async fn register(&self, spec: JobSpec) -> Result<(), SchedulerError> {
        let state = self.state.lock().await;
        if !matches!(*state, SchedulerState::Created | SchedulerState::Started) {
            return Err(SchedulerError::InvalidState {
                op: "register",
                state: *state,
            });
        }

        let mut registry = self.registry.lock().await;
        registry.insert(spec.clone())?;
        self.bus
            .publish(Event::new(EventKind::JobRegistered).with_job(spec.shared_name()));

        if *state == SchedulerState::Started {
            registry.attach(self.spawn_timer(spec));
        }
        Ok(())
    }

    /// Removes a job; its timer loop (if running) is cancelled.
    ///
    /// Executions already dispatched keep running and are still awaited by `stop()`.
    pub async fn deregister(&self, name: &str) -> Result<(), SchedulerError> {
        let _state = self.state.lock().await;
        let spec = self.registry.lock().await.remove(name)?;
        self.bus
            .publish(Event::new(EventKind::JobDeregistered).with_job(spec.shared_name()));
        Ok(())
    }

    /// Spawns one timer loop per registered job. Non-blocking.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        if *state != SchedulerState::Created {
            return Err(SchedulerError::InvalidState {
                op: "start",
                state: *state,
            });
        }

        let mut registry = self.registry.lock().await;
        let specs = registry.unstarted();
        let spawned = specs.len();
        for spec in specs {
            registry.attach(self.spawn_timer(spec));
        }
        *state = SchedulerState::Started;
        self.bus.publish(
            Event::new(EventKind::SchedulerStarted).with_reason(format!("timers={spawned}")),
        );
        Ok(())
    }

    /// Gracefully stops the scheduler.
    ///
    /// Signals every timer loop, then waits (bounded by [`SchedulerConfig::grace`])
    /// for the loops to exit and for every in-flight dispatch to complete,
    /// callbacks included.
    ///
    /// ### Errors
    /// - [`SchedulerError::GraceExceeded`]: loops were aborted, state is `Killed`
    /// - [`SchedulerError::TimerPanicked`]: a loop died of a panic (state is `Stopped`)
    /// - [`SchedulerError::InvalidState`]: another `stop()` is in progress
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.lock().await;
            match *state {
                SchedulerState::Started => *state = SchedulerState::Stopping,
                SchedulerState::Created => {
                    *state = SchedulerState::Stopped;
                    self.shutdown.cancel();
                    return Ok(());
                }
                SchedulerState::Stopped | SchedulerState::Killed => return Ok(()),
                SchedulerState::Stopping => {
                    return Err(SchedulerError::InvalidState {
                        op: "stop",
                        state: SchedulerState::Stopping,
                    });
                }
            }
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown.cancel();
        let (timers, pruned) = {
            let mut registry = self.registry.lock().await;
            (registry.take_timers(), registry.take_failure())
        };
        let watch: Vec<(Arc<str>, AbortHandle)> = timers
            .iter()
            .map(|t| (Arc::clone(&t.name), t.join.abort_handle()))
            .collect();

        let grace = self.cfg.grace;
        let drained = time::timeout(grace, async {
            let joined = join_all(timers).await;
            self.tracker.close();
            self.tracker.wait().await;
            joined
        })
        .await;

        let mut state = self.state.lock().await;
        match drained {
            Ok(joined) => {
                *state = SchedulerState::Stopped;
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                pruned.map_or(joined, Err)
            }
            Err(_elapsed) => {
                let mut stuck: Vec<String> = Vec::new();
                for (name, abort) in &watch {
                    if !abort.is_finished() {
                        abort.abort();
                        stuck.push(name.to_string());
                    }
                }
                self.tracker.close();
                if !self.tracker.is_empty() {
                    stuck.push(format!("{} dispatch tasks still running", self.tracker.len()));
                }
                self.kill.cancel();
                *state = SchedulerState::Killed;
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
                );
                Err(SchedulerError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Terminates the scheduler without waiting for in-flight executions.
    ///
    /// Timer loops are aborted and joined; handlers observing
    /// [`JobContext::killed`](crate::JobContext::killed) are told to give up.
    /// Outcomes arriving later are still routed to their callbacks.
    pub async fn kill(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        match *state {
            SchedulerState::Killed | SchedulerState::Stopped => return Ok(()),
            SchedulerState::Stopping => {
                return Err(SchedulerError::InvalidState {
                    op: "kill",
                    state: SchedulerState::Stopping,
                });
            }
            SchedulerState::Created | SchedulerState::Started => {}
        }

        self.kill.cancel();
        self.shutdown.cancel();
        let (timers, pruned) = {
            let mut registry = self.registry.lock().await;
            (registry.take_timers(), registry.take_failure())
        };
        for timer in &timers {
            timer.join.abort();
        }
        let joined = join_all(timers).await;
        self.tracker.close();

        *state = SchedulerState::Killed;
        self.bus.publish(Event::new(EventKind::SchedulerKilled));
        pruned.map_or(joined, Err)
    }

    /// Starts the scheduler, waits for a termination signal, then stops gracefully.
    ///
    /// Signals: SIGINT, SIGTERM, SIGQUIT on Unix; Ctrl-C elsewhere.
    pub async fn run_until_signal(&self) -> Result<(), SchedulerError> {
        self.start().await?;
        let signal = shutdown::wait_for_shutdown_signal().await;
        self.stop().await?;
        signal.map_err(|e| SchedulerError::SignalUnavailable {
            reason: e.to_string(),
        })
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SchedulerState {
        *self.state.lock().await
    }

    /// Returns the sorted list of registered job names.
    pub async fn jobs(&self) -> Vec<String> {
        self.registry.lock().await.names()
    }

    /// Raw receiver for every subsequent runtime event.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configuration this scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    fn spawn_timer(&self, spec: JobSpec) -> TimerHandle {
        let cancel = self.shutdown.child_token();
        let name = spec.shared_name();
        let timer = TimerLoop::new(
            spec,
            Arc::clone(&self.clock),
            self.cfg.poll_interval_clamped(),
            self.bus.clone(),
            self.dispatcher.clone(),
        );
        let join = tokio::spawn(timer.run(cancel.clone()));
        TimerHandle { name, join, cancel }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.listener.cancel();
    }
}

/// Joins every timer loop; returns the first panic, if any.
async fn join_all(timers: Vec<TimerHandle>) -> Result<(), SchedulerError> {
    let mut first = Ok(());
    for timer in timers {
        if let Err(e) = timer.join().await {
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::TokioClock;
    use crate::error::JobError;
    use crate::jobs::{JobContext, JobFn, JobOutput, OutcomeFn};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn scheduler(grace: Duration) -> Arc<Scheduler> {
        let cfg = SchedulerConfig {
            grace,
            ..SchedulerConfig::default()
        };
        SchedulerBuilder::new(cfg)
            .with_clock(Arc::new(TokioClock::anchored(t0())))
            .without_log_writer()
            .build()
    }

    fn counting(name: &'static str, hits: Arc<AtomicU64>) -> JobSpec {
        let job = JobFn::arc(name, move |_ctx: JobContext| {
            let hits = Arc::clone(&hits);
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(serde_json::json!(n))
            }
        });
        JobSpec::new(job, "* * * * * *").unwrap()
    }

    fn sleeping(name: &'static str, secs: u64, done: Arc<AtomicU64>) -> JobSpec {
        let job = JobFn::arc(name, move |_ctx: JobContext| {
            let done = Arc::clone(&done);
            async move {
                time::sleep(Duration::from_secs(secs)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(JobOutput::Null)
            }
        });
        JobSpec::new(job, "* * * * * *").unwrap()
    }

    type Seen = Arc<StdMutex<Vec<(u64, Result<JobOutput, JobError>)>>>;

    fn recording(seen: Seen) -> crate::jobs::OutcomeRef {
        let ok = Arc::clone(&seen);
        OutcomeFn::arc(
            move |ctx: &JobContext, out: JobOutput| ok.lock().unwrap().push((ctx.seq(), Ok(out))),
            move |ctx: &JobContext, err: &JobError| {
                seen.lock().unwrap().push((ctx.seq(), Err(err.clone())))
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn every_second_job_fires_three_times_in_3200ms() {
        let sched = scheduler(Duration::from_secs(5));
        let fired: Arc<StdMutex<Vec<(u64, DateTime<Utc>)>>> = Arc::default();
        let log = Arc::clone(&fired);
        let counter = Arc::new(AtomicU64::new(0));
        let job = JobFn::arc("tick", move |ctx: JobContext| {
            let log = Arc::clone(&log);
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                log.lock().unwrap().push((n, ctx.dispatched_at()));
                Ok(serde_json::json!(n))
            }
        });
        sched
            .register(JobSpec::new(job, "* * * * * *").unwrap())
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(3_200)).await;
        sched.stop().await.unwrap();

        let fired = fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 3);
        for (i, (n, at)) in fired.iter().enumerate() {
            let expected = t0() + chrono::Duration::seconds(i as i64 + 1);
            assert_eq!(*n, i as u64 + 1);
            assert!((*at - expected).num_milliseconds().abs() <= 5, "{at} vs {expected}");
        }
        assert_eq!(sched.state().await, SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight_work_and_nothing_fires_afterwards() {
        let sched = scheduler(Duration::from_secs(30));
        let done = Arc::new(AtomicU64::new(0));
        sched
            .register(sleeping("slow", 2, Arc::clone(&done)))
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        sched.stop().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(sched.state().await, SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_returns_without_waiting_and_late_outcomes_are_harmless() {
        let sched = scheduler(Duration::from_secs(30));
        let done = Arc::new(AtomicU64::new(0));
        let seen: Seen = Arc::default();
        sched
            .register(
                sleeping("stubborn", 60, Arc::clone(&done))
                    .with_outcome(recording(Arc::clone(&seen))),
            )
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;

        let before = time::Instant::now();
        sched.kill().await.unwrap();
        assert!(before.elapsed() < Duration::from_millis(10));
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert_eq!(sched.state().await, SchedulerState::Killed);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![(1, Ok(JobOutput::Null))]);
    }

    #[tokio::test(start_paused = true)]
    async fn grace_exceeded_aborts_and_reports() {
        let sched = scheduler(Duration::from_secs(1));
        sched
            .register(sleeping("stuck", 3_600, Arc::new(AtomicU64::new(0))))
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;

        match sched.stop().await {
            Err(SchedulerError::GraceExceeded { grace, stuck }) => {
                assert_eq!(grace, Duration::from_secs(1));
                assert!(stuck.iter().any(|s| s.contains("dispatch tasks still running")));
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
        assert_eq!(sched.state().await, SchedulerState::Killed);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_job_does_not_disturb_another() {
        let sched = scheduler(Duration::from_secs(5));
        let good_hits = Arc::new(AtomicU64::new(0));
        let good_seen: Seen = Arc::default();
        let bad_seen: Seen = Arc::default();

        let bad = JobFn::arc("bad", |ctx: JobContext| async move {
            if ctx.seq() == 2 {
                panic!("bad handler crashed");
            }
            Err(JobError::fail("bad input"))
        });
        let bad = JobSpec::new(bad, "* * * * * *")
            .unwrap()
            .with_outcome(recording(Arc::clone(&bad_seen)));
        let good = counting("good", Arc::clone(&good_hits))
            .with_outcome(recording(Arc::clone(&good_seen)));
        sched.register(bad).await.unwrap();
        sched.register(good).await.unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(3_200)).await;
        sched.stop().await.unwrap();

        let mut good = good_seen.lock().unwrap().clone();
        good.sort_by_key(|(seq, _)| *seq);
        assert_eq!(
            good,
            vec![
                (1, Ok(serde_json::json!(1))),
                (2, Ok(serde_json::json!(2))),
                (3, Ok(serde_json::json!(3))),
            ]
        );

        let mut bad = bad_seen.lock().unwrap().clone();
        bad.sort_by_key(|(seq, _)| *seq);
        assert_eq!(
            bad,
            vec![
                (1, Err(JobError::fail("bad input"))),
                (
                    2,
                    Err(JobError::Panicked {
                        info: "bad handler crashed".into()
                    })
                ),
                (3, Err(JobError::fail("bad input"))),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn executions_of_one_job_may_overlap() {
        let sched = scheduler(Duration::from_secs(30));
        let running = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let job = JobFn::arc("overlap", move |_ctx: JobContext| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_millis(2_500)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(JobOutput::Null)
            }
        });
        sched
            .register(JobSpec::new(job, "* * * * * *").unwrap())
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(3_200)).await;
        sched.stop().await.unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_immediately_runs_once_on_start() {
        let sched = scheduler(Duration::from_secs(5));
        let hits = Arc::new(AtomicU64::new(0));
        let seen: Seen = Arc::default();
        let spec = counting("eager", Arc::clone(&hits))
            .with_fire_immediately(true)
            .with_outcome(recording(Arc::clone(&seen)));
        sched.register(spec).await.unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_200)).await;
        sched.stop().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(seq, _)| *seq);
        assert_eq!(
            seen,
            vec![(1, Ok(serde_json::json!(1))), (2, Ok(serde_json::json!(2)))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_can_join_and_leave_a_running_scheduler() {
        let sched = scheduler(Duration::from_secs(5));
        let hits = Arc::new(AtomicU64::new(0));
        sched.start().await.unwrap();

        time::sleep(Duration::from_millis(500)).await;
        sched
            .register(counting("late", Arc::clone(&hits)))
            .await
            .unwrap();
        assert_eq!(sched.jobs().await, vec!["late".to_string()]);

        time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        sched.deregister("late").await.unwrap();
        assert!(sched.jobs().await.is_empty());
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        sched.stop().await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_misuse_is_rejected() {
        let sched = scheduler(Duration::from_secs(1));
        let hits = Arc::new(AtomicU64::new(0));
        sched
            .register(counting("a", Arc::clone(&hits)))
            .await
            .unwrap();

        let dup = sched.register(counting("a", Arc::clone(&hits))).await;
        assert!(matches!(dup, Err(SchedulerError::DuplicateJob { .. })));
        let missing = sched.deregister("nope").await;
        assert!(matches!(missing, Err(SchedulerError::JobNotFound { .. })));

        sched.start().await.unwrap();
        let again = sched.start().await;
        assert!(matches!(
            again,
            Err(SchedulerError::InvalidState {
                op: "start",
                state: SchedulerState::Started
            })
        ));

        sched.stop().await.unwrap();
        sched.stop().await.unwrap();
        sched.kill().await.unwrap();
        assert_eq!(sched.state().await, SchedulerState::Stopped);

        let late = sched.register(counting("b", hits)).await;
        assert!(matches!(
            late,
            Err(SchedulerError::InvalidState {
                op: "register",
                state: SchedulerState::Stopped
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_kill_are_rejected_while_stopping() {
        let sched = scheduler(Duration::from_secs(30));
        let done = Arc::new(AtomicU64::new(0));
        sched
            .register(sleeping("slow", 5, Arc::clone(&done)))
            .await
            .unwrap();
        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_500)).await;

        let first = tokio::spawn({
            let sched = Arc::clone(&sched);
            async move { sched.stop().await }
        });
        while sched.state().await != SchedulerState::Stopping {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            sched.stop().await,
            Err(SchedulerError::InvalidState {
                op: "stop",
                state: SchedulerState::Stopping
            })
        ));
        assert!(matches!(
            sched.kill().await,
            Err(SchedulerError::InvalidState {
                op: "kill",
                state: SchedulerState::Stopping
            })
        ));

        first.await.unwrap().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(sched.state().await, SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn handlers_observe_the_kill() {
        let sched = scheduler(Duration::from_secs(30));
        let observed = Arc::new(AtomicU64::new(0));
        let flag = Arc::clone(&observed);
        let job = JobFn::arc("watcher", move |ctx: JobContext| {
            let flag = Arc::clone(&flag);
            async move {
                while !ctx.is_killed() {
                    time::sleep(Duration::from_millis(100)).await;
                }
                flag.fetch_add(1, Ordering::SeqCst);
                Err(JobError::fail("killed"))
            }
        });
        sched
            .register(JobSpec::new(job, "0 0 * * * *").unwrap().with_fire_immediately(true))
            .await
            .unwrap();

        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 0);

        sched.kill().await.unwrap();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_started_scheduler_can_stop_or_be_killed() {
        let stopped = scheduler(Duration::from_secs(1));
        stopped.stop().await.unwrap();
        assert_eq!(stopped.state().await, SchedulerState::Stopped);

        let killed = scheduler(Duration::from_secs(1));
        killed.kill().await.unwrap();
        killed.kill().await.unwrap();
        assert_eq!(killed.state().await, SchedulerState::Killed);
        assert!(matches!(
            killed.start().await,
            Err(SchedulerError::InvalidState { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_events_reach_raw_subscribers() {
        let sched = scheduler(Duration::from_secs(1));
        let mut rx = sched.subscribe();
        sched
            .register(counting("evt", Arc::new(AtomicU64::new(0))))
            .await
            .unwrap();
        sched.start().await.unwrap();
        time::sleep(Duration::from_millis(1_100)).await;
        sched.stop().await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds.first(), Some(&EventKind::JobRegistered));
        assert!(kinds.contains(&EventKind::SchedulerStarted));
        assert!(kinds.contains(&EventKind::JobSucceeded));
        assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
    }
}
