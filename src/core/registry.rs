//! # Job registry: registered specs and their timer handles.
//!
//! ```text
//! register(spec)    → insert(spec)          (DuplicateJob if the name is taken)
//! start()           → unstarted() → attach(name, handle) per job
//! deregister(name)  → remove(name)          → cancel timer, keep handle in `retired`
//!                                           → drop retired handles that already finished
//! stop() / kill()   → take_timers()         → join every live and retired handle
//!                   → take_failure()        → first panic of a pruned handle
//! ```
//!
//! ## Rules
//! - The registry owns the timer handles (`JoinHandle` + `CancellationToken`).
//! - A retired handle is kept until it finishes or `stop()`/`kill()` joins it, so a
//!   deregistered loop that is still finishing its last iteration is never lost.
//! - Finished retired handles are pruned on every `remove`/`attach`; a panic found
//!   while pruning is kept and reported by `stop()`/`kill()`.
//! - The registry never spawns anything; the scheduler does, under its lifecycle lock.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::timer::TimerExit;
use crate::error::{SchedulerError, panic_message};
use crate::jobs::JobSpec;

/// Handle to a running timer loop.
pub(crate) struct TimerHandle {
    /// Job owning the loop.
    pub(crate) name: Arc<str>,
    /// Join handle of the loop task.
    pub(crate) join: JoinHandle<TimerExit>,
    /// Cancellation token of this loop only (child of the shutdown token).
    pub(crate) cancel: CancellationToken,
}

impl TimerHandle {
    /// Awaits the loop; cancellation is expected, a panic is reported.
    pub(crate) async fn join(self) -> Result<(), SchedulerError> {
        report(&self.name, self.join.await)
    }

    /// Result of a loop that already finished; `None` while it is still running.
    fn try_join(&mut self) -> Option<Result<(), SchedulerError>> {
        if !self.join.is_finished() {
            return None;
        }
        let res = (&mut self.join).now_or_never()?;
        Some(report(&self.name, res))
    }
}

fn report(name: &str, res: Result<TimerExit, JoinError>) -> Result<(), SchedulerError> {
    match res {
        Ok(_) => Ok(()),
        Err(e) if e.is_panic() => Err(SchedulerError::TimerPanicked {
            job: name.to_string(),
            info: panic_message(e.into_panic().as_ref()),
        }),
        Err(_) => Ok(()),
    }
}

struct Entry {
    spec: JobSpec,
    timer: Option<TimerHandle>,
}

/// Registered jobs keyed by name.
#[derive(Default)]
pub(crate) struct Registry {
    jobs: HashMap<String, Entry>,
    retired: Vec<TimerHandle>,
    failure: Option<SchedulerError>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a job without a timer.
    pub(crate) fn insert(&mut self, spec: JobSpec) -> Result<(), SchedulerError> {
        if self.jobs.contains_key(spec.name()) {
            return Err(SchedulerError::DuplicateJob {
                name: spec.name().to_string(),
            });
        }
        self.jobs
            .insert(spec.name().to_string(), Entry { spec, timer: None });
        Ok(())
    }

    /// Removes a job and cancels its timer loop, if one is running.
    pub(crate) fn remove(&mut self, name: &str) -> Result<JobSpec, SchedulerError> {
        let entry = self
            .jobs
            .remove(name)
            .ok_or_else(|| SchedulerError::JobNotFound {
                name: name.to_string(),
            })?;
        if let Some(timer) = entry.timer {
            timer.cancel.cancel();
            self.retired.push(timer);
        }
        self.prune_retired();
        Ok(entry.spec)
    }

    /// Attaches a freshly spawned timer to a registered job.
    pub(crate) fn attach(&mut self, handle: TimerHandle) {
        match self.jobs.get_mut(&*handle.name) {
            Some(entry) => entry.timer = Some(handle),
            None => {
                handle.cancel.cancel();
                self.retired.push(handle);
            }
        }
        self.prune_retired();
    }

    /// Drops retired handles whose loop already exited, keeping the first panic.
    fn prune_retired(&mut self) {
        let mut failure = self.failure.take();
        self.retired.retain_mut(|handle| match handle.try_join() {
            None => true,
            Some(Ok(())) => false,
            Some(Err(e)) => {
                if failure.is_none() {
                    failure = Some(e);
                }
                false
            }
        });
        self.failure = failure;
    }

    /// Specs of jobs that have no timer yet, sorted by name.
    pub(crate) fn unstarted(&self) -> Vec<JobSpec> {
        let mut specs: Vec<JobSpec> = self
            .jobs
            .values()
            .filter(|e| e.timer.is_none())
            .map(|e| e.spec.clone())
            .collect();
        specs.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        specs
    }

    /// Detaches every live and retired timer handle.
    pub(crate) fn take_timers(&mut self) -> Vec<TimerHandle> {
        let mut handles: Vec<TimerHandle> = self
            .jobs
            .values_mut()
            .filter_map(|e| e.timer.take())
            .collect();
        handles.append(&mut self.retired);
        handles
    }

    /// First panic of a retired loop that was pruned before being joined.
    pub(crate) fn take_failure(&mut self) -> Option<SchedulerError> {
        self.failure.take()
    }

    /// Returns sorted list of registered job names.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
