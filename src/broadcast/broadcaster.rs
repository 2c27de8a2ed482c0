//! Broadcaster
//!
//! Orchestrates fan-out: every broadcast takes a registry snapshot and spawns one
//! delivery task per subscriber. Nothing here waits on a delivery outcome;
//! failures arrive on the [`ErrorStream`] instead.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::delivery;
use super::shutdown::StopSignal;
use super::sink::{self, ErrorSink, ErrorStream};
use crate::config::BroadcasterConfig;
use crate::error::{Error, Result, NO_SUBSCRIBER_ID};
use crate::registry::{inbox, Inbox, Subscriber, SubscriberEntry, SubscriberRegistry};
use crate::stats::{DeliveryCounters, DeliveryStats};

/// In-process pub/sub broadcaster
///
/// Cheap to clone; clones share the same registry, error stream and stop signal.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use fanout::Broadcaster;
///
/// # async fn example() -> fanout::Result<()> {
/// let (broadcaster, mut errors) = Broadcaster::with_timeout(Duration::from_millis(50));
///
/// tokio::spawn(async move {
///     while let Some(err) = errors.recv().await {
///         eprintln!("{}: {}", err.subscriber_id(), err);
///     }
/// });
///
/// let mut inbox = broadcaster.subscribe("a").await?;
/// tokio::spawn(async move {
///     while let Some(msg) = inbox.recv().await {
///         println!("got {} bytes", msg.len());
///     }
/// });
///
/// broadcaster.broadcast("hello").await;
/// broadcaster.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Broadcaster {
    config: BroadcasterConfig,
    registry: Arc<SubscriberRegistry>,
    sink: ErrorSink,
    stop: Arc<StopSignal>,
    counters: Arc<DeliveryCounters>,
}

impl Broadcaster {
    /// Create a new broadcaster.
    ///
    /// Returns the broadcaster and the stream its errors are reported on. The
    /// stream must be drained continuously; see [`BroadcasterConfig::error_capacity`].
    pub fn new(config: BroadcasterConfig) -> (Self, ErrorStream) {
        let counters = Arc::new(DeliveryCounters::default());
        let (sink, errors) = sink::channel(config.error_capacity, Arc::clone(&counters));

        let broadcaster = Self {
            registry: Arc::new(SubscriberRegistry::new(
                config.default_timeout,
                config.inbox_capacity,
            )),
            config,
            sink,
            stop: Arc::new(StopSignal::new()),
            counters,
        };

        (broadcaster, errors)
    }

    /// Create a broadcaster with the given default subscriber timeout
    pub fn with_timeout(default_timeout: Duration) -> (Self, ErrorStream) {
        Self::new(BroadcasterConfig::with_timeout(default_timeout))
    }

    /// Get the broadcaster configuration
    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    /// Register a subscriber
    ///
    /// Returns the inbox to read from when the broadcaster created it, or `None`
    /// when the subscriber supplied its own.
    pub async fn register(&self, subscriber: Subscriber) -> Result<Option<Inbox>> {
        self.registry.register(subscriber, self.stop.token()).await
    }

    /// Register a subscriber with a fresh inbox and the default timeout
    pub async fn subscribe(&self, id: impl Into<String>) -> Result<Inbox> {
        let (sender, inbox) = inbox::channel(self.config.inbox_capacity);
        self.register(Subscriber::new(id).with_inbox(sender)).await?;
        Ok(inbox)
    }

    /// Remove a subscriber and close its inbox
    pub async fn unsubscribe(&self, id: &str) -> Result<()> {
        self.registry.remove(id).await
    }

    /// Send a message to every registered subscriber
    ///
    /// Spawns one delivery task per subscriber and returns how many were spawned.
    pub async fn broadcast(&self, message: impl Into<Bytes>) -> usize {
        let message = message.into();

        let stopped = self.stop.is_triggered();
        if stopped {
            self.report_stopped_broadcast(&message).await;
        }

        let targets = self.registry.snapshot().await;
        let count = targets.len();

        // Stop drains the registry after raising the flag, so an empty snapshot
        // taken mid-stop must still be reported
        if !stopped && count == 0 && self.stop.is_triggered() {
            self.report_stopped_broadcast(&message).await;
        }

        for entry in targets {
            self.spawn_delivery(message.clone(), entry);
        }

        tracing::trace!(subscribers = count, bytes = message.len(), "Broadcast");

        count
    }

    /// Send a message to a single subscriber
    ///
    /// Useful for retrying a message reported on the error stream.
    pub async fn send_to(&self, message: impl Into<Bytes>, id: &str) {
        let message = message.into();

        if self.stop.is_triggered() {
            self.sink.report(Error::shutting_down(id, message)).await;
            return;
        }

        match self.registry.get(id).await {
            Some(entry) => self.spawn_delivery(message, entry),
            // Lookup lost a race with stop
            None if self.stop.is_triggered() => {
                self.sink.report(Error::shutting_down(id, message)).await;
            }
            None => {
                tracing::debug!(subscriber = %id, "Send to unknown subscriber");
                self.sink
                    .report(Error::UnknownId {
                        subscriber_id: id.to_string(),
                        message: Some(message),
                    })
                    .await;
            }
        }
    }

    /// Stop the broadcaster, closing every subscriber's inbox
    ///
    /// Stopping is permanent. Returns `false` if the broadcaster was already
    /// stopped, in which case nothing happens.
    pub async fn stop(&self) -> bool {
        if !self.stop.trigger() {
            tracing::warn!("Broadcaster already stopped");
            return false;
        }

        let closed = self.registry.close_all().await;
        tracing::info!(subscribers = closed, "Broadcaster stopped");

        true
    }

    /// Check whether the broadcaster has been stopped
    pub fn is_stopped(&self) -> bool {
        self.stop.is_triggered()
    }

    /// Wait until the broadcaster is stopped
    pub async fn stopped(&self) {
        self.stop.triggered().await
    }

    /// Check if a subscriber is registered
    pub async fn contains(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    /// IDs of all registered subscribers, in no particular order
    pub async fn subscriber_ids(&self) -> Vec<String> {
        self.registry.ids().await
    }

    /// Delivery statistics since creation
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    async fn report_stopped_broadcast(&self, message: &Bytes) {
        self.sink
            .report(Error::ShuttingDown {
                subscriber_id: NO_SUBSCRIBER_ID.to_string(),
                message: Some(message.clone()),
                full_broadcast: true,
            })
            .await;
    }

    fn spawn_delivery(&self, message: Bytes, entry: SubscriberEntry) {
        let stop = self.stop.token().clone();
        let sink = self.sink.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            // The entry is consumed here so its inbox handle is gone before reporting
            match delivery::deliver(message, entry, &stop).await {
                Ok(()) => counters.record_delivered(),
                Err(err) => {
                    tracing::debug!(
                        subscriber = %err.subscriber_id(),
                        reason = err.as_label(),
                        "Delivery failed"
                    );
                    sink.report(err).await;
                }
            }
        });
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("config", &self.config)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
