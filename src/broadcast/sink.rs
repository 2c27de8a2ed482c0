//! Error stream
//!
//! Every delivery failure is pushed onto one bounded channel. The broadcaster
//! keeps the sending half for its whole lifetime, so the stream never ends
//! while the broadcaster is alive; the caller is expected to keep draining it.
//!
//! Reporting waits for room on the channel. A consumer that stops draining
//! therefore stalls delivery tasks, including ones for unrelated subscribers.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Error;
use crate::stats::DeliveryCounters;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Create a connected sink/stream pair
pub(crate) fn channel(
    capacity: usize,
    counters: Arc<DeliveryCounters>,
) -> (ErrorSink, ErrorStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ErrorSink { tx, counters }, ErrorStream { rx })
}

/// Sending half of the error stream, cloned into every delivery task
#[derive(Debug, Clone)]
pub(crate) struct ErrorSink {
    tx: mpsc::Sender<Error>,
    counters: Arc<DeliveryCounters>,
}

impl ErrorSink {
    /// Count and publish a failure
    pub(crate) async fn report(&self, err: Error) {
        self.counters.record_error(&err);

        if let Err(mpsc::error::SendError(err)) = self.tx.send(err).await {
            tracing::warn!(
                subscriber = %err.subscriber_id(),
                reason = err.as_label(),
                "Error stream dropped, discarding error"
            );
        }
    }
}

/// Stream of delivery failures returned alongside the broadcaster
#[derive(Debug)]
pub struct ErrorStream {
    rx: mpsc::Receiver<Error>,
}

impl ErrorStream {
    /// Receive the next error.
    ///
    /// Only returns `None` after the broadcaster and all of its in-flight
    /// delivery tasks are gone.
    pub async fn recv(&mut self) -> Option<Error> {
        self.rx.recv().await
    }

    /// Receive an error without waiting
    pub fn try_recv(&mut self) -> Result<Error, TryRecvError> {
        self.rx.try_recv()
    }

    /// Drain every error that is ready right now
    pub fn drain_ready(&mut self) -> Vec<Error> {
        let mut errors = Vec::new();
        while let Ok(err) = self.rx.try_recv() {
            errors.push(err);
        }
        errors
    }
}
