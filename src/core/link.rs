//! # ResultLink: one-shot handoff of an execution outcome.
//!
//! ```text
//! LinkPublisher (writer, moved into the linking step)
//!     ├─ publish(result)        → sends (ctx, result), consumes the publisher
//!     └─ dropped unpublished    → sends (ctx, Err(Abandoned))
//!                  │
//!                  ▼  tokio::sync::oneshot
//! ResultLink (reader, kept by the dispatcher)
//!     └─ wait().await           → LinkOutcome
//! ```
//!
//! ## Rules
//! - Exactly one outcome per link: `publish` consumes the publisher, and `Drop`
//!   only sends when nothing was sent yet.
//! - The waiter can never hang: every exit path of the writer (normal return,
//!   panic unwinding, task abort, runtime shutdown) ends in a send.

use tokio::sync::oneshot;

use crate::error::JobError;
use crate::jobs::{JobContext, JobOutput};

/// Outcome of one execution: the context it ran with and its result.
#[derive(Debug)]
pub struct LinkOutcome {
    /// Context of the finished dispatch.
    pub context: JobContext,
    /// Success value or error (never both, never neither).
    pub result: Result<JobOutput, JobError>,
}

/// Writing half of a result link.
pub struct LinkPublisher {
    tx: Option<oneshot::Sender<LinkOutcome>>,
    context: JobContext,
}

/// Reading half of a result link.
pub struct ResultLink {
    rx: oneshot::Receiver<LinkOutcome>,
    context: JobContext,
}

impl ResultLink {
    /// Creates a connected publisher/link pair for one dispatch.
    pub fn channel(context: JobContext) -> (LinkPublisher, ResultLink) {
        let (tx, rx) = oneshot::channel();
        (
            LinkPublisher {
                tx: Some(tx),
                context: context.clone(),
            },
            ResultLink { rx, context },
        )
    }

    /// Waits until the outcome is published.
    pub async fn wait(self) -> LinkOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Only reachable if the publisher was leaked with `mem::forget`.
            Err(_) => LinkOutcome {
                context: self.context,
                result: Err(JobError::Abandoned),
            },
        }
    }
}

impl LinkPublisher {
    /// Publishes the outcome.
    pub fn publish(mut self, result: Result<JobOutput, JobError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<JobOutput, JobError>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(LinkOutcome {
                context: self.context.clone(),
                result,
            });
        }
    }
}

impl Drop for LinkPublisher {
    fn drop(&mut self) {
        self.send(Err(JobError::Abandoned));
    }
}
