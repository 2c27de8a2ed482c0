//! Subscriber inbox channel
//!
//! An inbox is a bounded queue of payloads where every queued item carries an
//! acknowledgement slot. A payload only counts as delivered once the consumer
//! takes it out of its [`Inbox`]; a publisher that gives up on an item (deadline
//! or shutdown) withdraws it, and the consumer silently skips it.
//!
//! ```text
//!   delivery task                         consumer
//!   ─────────────                         ────────
//!   reserve slot ──► Envelope{payload, ack} ──► Inbox::recv()
//!   wait on ack  ◄─────────── ack.send(()) ◄──┘
//! ```
//!
//! Both halves share a closed signal. Once it fires (unsubscribe or broadcaster
//! stop) the consumer stops taking envelopes and `recv` returns `None`, even if
//! sender clones are still alive. Envelopes still queued at that point are never
//! acknowledged, so their deliveries resolve as shutdown errors.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub use tokio::sync::mpsc::error::TryRecvError;

/// A queued payload plus the slot used to confirm it was taken
struct Envelope {
    payload: Bytes,
    ack: oneshot::Sender<()>,
}

/// Result of offering a payload to an inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// The consumer took the payload
    Accepted,
    /// The inbox is closed, or the consumer went away before taking the payload
    Closed,
}

/// Create a new inbox channel with the given capacity (minimum 1)
pub fn channel(capacity: usize) -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let closed = CancellationToken::new();
    (
        InboxSender {
            tx,
            closed: closed.clone(),
        },
        Inbox { rx, closed },
    )
}

/// Sending half of a subscriber inbox
///
/// Handed to the broadcaster at registration. Clones share the closed signal,
/// so closing the subscriber closes the inbox for every clone.
#[derive(Clone)]
pub struct InboxSender {
    tx: mpsc::Sender<Envelope>,
    closed: CancellationToken,
}

impl InboxSender {
    /// Whether the inbox has been closed by either side
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    pub(crate) fn closed_token(&self) -> &CancellationToken {
        &self.closed
    }

    /// Queue a payload and wait until the consumer takes it.
    ///
    /// The closed signal is checked after a slot is reserved so that nothing is
    /// queued once the subscriber has been shut down.
    pub(crate) async fn offer(
        &self,
        payload: Bytes,
        ack: oneshot::Sender<()>,
        ack_rx: &mut oneshot::Receiver<()>,
    ) -> Offer {
        let permit = match self.tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => return Offer::Closed,
        };

        if self.closed.is_cancelled() {
            return Offer::Closed;
        }

        permit.send(Envelope { payload, ack });

        match ack_rx.await {
            Ok(()) => Offer::Accepted,
            // Envelope dropped unacknowledged: inbox closed or dropped with it queued
            Err(_) => Offer::Closed,
        }
    }
}

impl std::fmt::Debug for InboxSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboxSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving half of a subscriber inbox
pub struct Inbox {
    rx: mpsc::Receiver<Envelope>,
    closed: CancellationToken,
}

impl Inbox {
    /// Receive the next payload.
    ///
    /// Returns `None` once the subscriber has been removed or the broadcaster
    /// stopped, or once every sender is gone.
    ///
    /// Cancel safe: a payload is only acknowledged after it is returned.
    pub async fn recv(&mut self) -> Option<Bytes> {
        loop {
            let envelope = tokio::select! {
                biased;
                _ = self.closed.cancelled() => return None,
                envelope = self.rx.recv() => envelope?,
            };

            if let Some(payload) = self.accept(envelope) {
                return Some(payload);
            }
            if self.closed.is_cancelled() {
                return None;
            }
        }
    }

    /// Receive a payload without waiting
    pub fn try_recv(&mut self) -> Result<Bytes, TryRecvError> {
        loop {
            if self.closed.is_cancelled() {
                return Err(TryRecvError::Disconnected);
            }
            let envelope = self.rx.try_recv()?;
            if let Some(payload) = self.accept(envelope) {
                return Ok(payload);
            }
        }
    }

    /// Whether the subscriber behind this inbox has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Close the inbox from the consumer side.
    ///
    /// Pending deliveries resolve as shutdown errors and queued payloads are
    /// discarded.
    pub fn close(&mut self) {
        self.closed.cancel();
        self.rx.close();
    }

    /// Acknowledge an envelope unless the inbox is closed or the publisher withdrew it
    fn accept(&self, envelope: Envelope) -> Option<Bytes> {
        if self.closed.is_cancelled() {
            return None;
        }
        envelope.ack.send(()).ok().map(|()| envelope.payload)
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox")
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}
