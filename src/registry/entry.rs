//! Subscriber types
//!
//! [`Subscriber`] is what callers hand to the broadcaster to register;
//! [`SubscriberEntry`] is the live handle the registry keeps for it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::inbox::InboxSender;

/// Registration request for a subscriber
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Unique, non-empty subscriber ID
    pub id: String,

    /// Inbox to deliver into (created by the broadcaster if absent)
    pub inbox: Option<InboxSender>,

    /// Per-delivery deadline (broadcaster default if absent or zero)
    pub timeout: Option<Duration>,
}

impl Subscriber {
    /// Create a registration request with an auto-created inbox and default timeout
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inbox: None,
            timeout: None,
        }
    }

    /// Deliver into a caller-supplied inbox
    ///
    /// The inbox belongs to this subscriber from now on: unsubscribing it or
    /// stopping the broadcaster closes the inbox for every clone of `inbox`,
    /// and the matching [`Inbox`](super::Inbox) then yields `None`.
    pub fn with_inbox(mut self, inbox: InboxSender) -> Self {
        self.inbox = Some(inbox);
        self
    }

    /// Set the per-delivery deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Live subscriber handle stored in the registry
///
/// Cloning is cheap; every delivery task gets its own clone. Clones share the
/// same inbox, and the inbox's closed signal is the subscriber's.
#[derive(Debug, Clone)]
pub struct SubscriberEntry {
    id: Arc<str>,
    inbox: InboxSender,
    timeout: Duration,
}

impl SubscriberEntry {
    pub(super) fn new(id: &str, inbox: InboxSender, timeout: Duration) -> Self {
        Self {
            id: Arc::from(id),
            inbox,
            timeout,
        }
    }

    /// Subscriber ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Per-delivery deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the subscriber has been removed or the broadcaster stopped
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    pub(crate) fn inbox(&self) -> &InboxSender {
        &self.inbox
    }

    pub(crate) fn closed_token(&self) -> &CancellationToken {
        self.inbox.closed_token()
    }

    /// Close the subscriber and its inbox. Safe to call repeatedly.
    pub(super) fn close(&self) {
        self.inbox.closed_token().cancel();
    }
}
