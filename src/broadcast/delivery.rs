//! Delivery engine
//!
//! One attempt delivers one message to one subscriber. The attempt races the
//! hand-off against a deadline created for this attempt alone, the broadcaster's
//! stop signal and the subscriber's own closed signal. When several are ready
//! at once the winner is picked at random; there is no fixed precedence.

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::registry::inbox::Offer;
use crate::registry::SubscriberEntry;

enum Outcome {
    Delivered,
    Deadline,
    ShuttingDown,
}

/// Attempt to deliver `message` to `entry`.
///
/// Returns `Ok(())` once the subscriber has taken the message, otherwise the
/// error to report. A closed or removed subscriber yields `ShuttingDown`.
///
/// Takes the entry by value so its inbox handle is released as soon as the
/// attempt resolves, before the caller waits on the error stream.
pub(crate) async fn deliver(
    message: Bytes,
    entry: SubscriberEntry,
    stop: &CancellationToken,
) -> Result<()> {
    if stop.is_cancelled() || entry.is_closed() {
        return Err(Error::shutting_down(entry.id(), message));
    }

    let (ack, mut ack_rx) = oneshot::channel();

    let outcome = tokio::select! {
        offer = entry.inbox().offer(message.clone(), ack, &mut ack_rx) => {
            match offer {
                Offer::Accepted => Outcome::Delivered,
                Offer::Closed => Outcome::ShuttingDown,
            }
        }
        _ = tokio::time::sleep(entry.timeout()) => Outcome::Deadline,
        _ = stop.cancelled() => Outcome::ShuttingDown,
        _ = entry.closed_token().cancelled() => Outcome::ShuttingDown,
    };

    let outcome = match outcome {
        Outcome::Delivered => Outcome::Delivered,
        failed => {
            // Withdraw the message; if the consumer took it first it still counts
            ack_rx.close();
            if ack_rx.try_recv().is_ok() {
                Outcome::Delivered
            } else {
                failed
            }
        }
    };

    match outcome {
        Outcome::Delivered => Ok(()),
        Outcome::Deadline => Err(Error::PublishDeadline {
            subscriber_id: entry.id().to_string(),
            message,
            timeout: entry.timeout(),
        }),
        Outcome::ShuttingDown => Err(Error::shutting_down(entry.id(), message)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::registry::{Subscriber, SubscriberRegistry};

    async fn setup(
        timeout: Duration,
    ) -> (SubscriberRegistry, CancellationToken, SubscriberEntry, crate::Inbox) {
        let registry = SubscriberRegistry::new(timeout, 4);
        let stop = CancellationToken::new();
        let inbox = registry
            .register(Subscriber::new("a"), &stop)
            .await
            .unwrap()
            .unwrap();
        let entry = registry.get("a").await.unwrap();
        (registry, stop, entry, inbox)
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let (_registry, stop, entry, mut inbox) = setup(Duration::from_secs(1)).await;

        let consumer = tokio::spawn(async move { inbox.recv().await });

        tokio_test::assert_ok!(deliver(Bytes::from_static(b"m"), entry, &stop).await);
        assert_eq!(consumer.await.unwrap().unwrap().as_ref(), b"m");
    }

    #[tokio::test]
    async fn test_deliver_deadline() {
        let (_registry, stop, entry, mut inbox) = setup(Duration::from_millis(10)).await;

        let err = deliver(Bytes::from_static(b"m"), entry, &stop)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::PublishDeadline { ref subscriber_id, timeout, .. }
                if subscriber_id == "a" && timeout == Duration::from_millis(10)
        ));
        assert_eq!(err.message().unwrap().as_ref(), b"m");

        // The withdrawn message is never handed to the consumer
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_after_stop() {
        let (_registry, stop, entry, _inbox) = setup(Duration::from_secs(1)).await;
        stop.cancel();

        let err = deliver(Bytes::from_static(b"m"), entry, &stop)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ShuttingDown { ref subscriber_id, full_broadcast: false, .. }
                if subscriber_id == "a"
        ));
    }

    #[tokio::test]
    async fn test_stop_interrupts_pending_delivery() {
        let (_registry, stop, entry, _inbox) = setup(Duration::from_secs(30)).await;

        let pending = {
            let stop = stop.clone();
            tokio::spawn(async move { deliver(Bytes::from_static(b"m"), entry, &stop).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::ShuttingDown { .. })));
    }

    #[tokio::test]
    async fn test_removed_subscriber_resolves_as_shutdown() {
        let (registry, stop, entry, _inbox) = setup(Duration::from_secs(30)).await;

        let pending = {
            let stop = stop.clone();
            tokio::spawn(async move { deliver(Bytes::from_static(b"m"), entry, &stop).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.remove("a").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::ShuttingDown { .. })));
        assert!(!stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_inbox_resolves_as_shutdown() {
        let (_registry, stop, entry, inbox) = setup(Duration::from_secs(30)).await;
        drop(inbox);

        let err = deliver(Bytes::from_static(b"m"), entry, &stop)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ShuttingDown { .. }));
    }
}
