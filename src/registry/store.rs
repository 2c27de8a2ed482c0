//! Subscriber registry implementation
//!
//! Maps subscriber IDs to their live handles. The lock is only ever held for
//! the map operation itself, never across a delivery.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::entry::{Subscriber, SubscriberEntry};
use super::inbox::{self, Inbox};
use crate::error::{Error, Result};

/// Registry of live subscribers
///
/// Thread-safe via `RwLock`. Fan-out only needs a read lock to take its snapshot.
pub struct SubscriberRegistry {
    /// Map of subscriber ID to live handle
    entries: RwLock<HashMap<String, SubscriberEntry>>,

    /// Timeout applied when a subscriber does not set one
    default_timeout: Duration,

    /// Capacity of inboxes created here
    inbox_capacity: usize,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new(default_timeout: Duration, inbox_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_timeout,
            inbox_capacity: inbox_capacity.max(1),
        }
    }

    /// Register a subscriber
    ///
    /// Fails with `ShuttingDown` once `shutdown` has fired. Returns the
    /// receiving half of the inbox when the registry created it.
    pub async fn register(
        &self,
        subscriber: Subscriber,
        shutdown: &CancellationToken,
    ) -> Result<Option<Inbox>> {
        if subscriber.id.is_empty() {
            return Err(Error::MissingId);
        }

        let timeout = match subscriber.timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => self.default_timeout,
        };

        let mut entries = self.entries.write().await;

        // Checked under the lock so a concurrent stop either sees this entry or we see the stop
        if shutdown.is_cancelled() {
            return Err(Error::ShuttingDown {
                subscriber_id: subscriber.id,
                message: None,
                full_broadcast: false,
            });
        }

        if entries.contains_key(&subscriber.id) {
            return Err(Error::DuplicateId {
                subscriber_id: subscriber.id,
            });
        }

        let (sender, created) = match subscriber.inbox {
            Some(sender) => (sender, None),
            None => {
                let (sender, inbox) = inbox::channel(self.inbox_capacity);
                (sender, Some(inbox))
            }
        };

        let entry = SubscriberEntry::new(&subscriber.id, sender, timeout);
        entries.insert(subscriber.id.clone(), entry);

        tracing::info!(
            subscriber = %subscriber.id,
            timeout = ?timeout,
            subscribers = entries.len(),
            "Subscriber registered"
        );

        Ok(created)
    }

    /// Remove a subscriber, closing its inbox
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;

        let entry = entries.remove(id).ok_or_else(|| Error::UnknownId {
            subscriber_id: id.to_string(),
            message: None,
        })?;

        entry.close();

        tracing::info!(
            subscriber = %id,
            subscribers = entries.len(),
            "Subscriber removed"
        );

        Ok(())
    }

    /// Look up a single subscriber
    pub async fn get(&self, id: &str) -> Option<SubscriberEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Point-in-time copy of every live subscriber
    pub async fn snapshot(&self) -> Vec<SubscriberEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Close and remove every subscriber in one pass
    ///
    /// Returns the number of subscribers closed.
    pub async fn close_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();

        for (id, entry) in entries.drain() {
            entry.close();
            tracing::debug!(subscriber = %id, "Subscriber closed on shutdown");
        }

        count
    }

    /// Check if a subscriber is registered
    pub async fn contains(&self, id: &str) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Number of live subscribers
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no subscribers are registered
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// IDs of all live subscribers, in no particular order
    pub async fn ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SubscriberRegistry {
        SubscriberRegistry::new(Duration::from_millis(50), 4)
    }

    #[tokio::test]
    async fn test_register_creates_inbox_and_defaults_timeout() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        let inbox = registry
            .register(Subscriber::new("a"), &shutdown)
            .await
            .unwrap();
        assert!(inbox.is_some());

        let entry = registry.get("a").await.unwrap();
        assert_eq!(entry.timeout(), Duration::from_millis(50));
        assert!(!entry.is_closed());
    }

    #[tokio::test]
    async fn test_register_zero_timeout_uses_default() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        registry
            .register(Subscriber::new("a").with_timeout(Duration::ZERO), &shutdown)
            .await
            .unwrap();
        registry
            .register(
                Subscriber::new("b").with_timeout(Duration::from_millis(7)),
                &shutdown,
            )
            .await
            .unwrap();

        assert_eq!(
            registry.get("a").await.unwrap().timeout(),
            Duration::from_millis(50)
        );
        assert_eq!(
            registry.get("b").await.unwrap().timeout(),
            Duration::from_millis(7)
        );
    }

    #[tokio::test]
    async fn test_register_keeps_very_long_timeout() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        registry
            .register(Subscriber::new("a").with_timeout(Duration::MAX), &shutdown)
            .await
            .unwrap();

        assert_eq!(registry.get("a").await.unwrap().timeout(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_register_with_supplied_inbox() {
        let registry = registry();
        let shutdown = CancellationToken::new();
        let (tx, _rx) = inbox::channel(1);

        let created = registry
            .register(Subscriber::new("a").with_inbox(tx), &shutdown)
            .await
            .unwrap();

        assert!(created.is_none());
        assert!(registry.contains("a").await);
    }

    #[tokio::test]
    async fn test_register_missing_id() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        let result = registry.register(Subscriber::new(""), &shutdown).await;

        assert!(matches!(result, Err(Error::MissingId)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_duplicate_keeps_first() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        registry
            .register(
                Subscriber::new("a").with_timeout(Duration::from_millis(1)),
                &shutdown,
            )
            .await
            .unwrap();
        let result = registry
            .register(
                Subscriber::new("a").with_timeout(Duration::from_millis(2)),
                &shutdown,
            )
            .await;

        assert!(matches!(
            result,
            Err(Error::DuplicateId { ref subscriber_id }) if subscriber_id == "a"
        ));
        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.get("a").await.unwrap().timeout(),
            Duration::from_millis(1)
        );
    }

    #[tokio::test]
    async fn test_register_after_shutdown() {
        let registry = registry();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = registry.register(Subscriber::new("a"), &shutdown).await;

        assert!(matches!(result, Err(Error::ShuttingDown { .. })));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_closes_entry_and_inbox() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        let mut inbox = registry
            .register(Subscriber::new("a"), &shutdown)
            .await
            .unwrap()
            .unwrap();
        let snapshot = registry.snapshot().await;

        registry.remove("a").await.unwrap();

        assert!(snapshot[0].is_closed());
        assert!(!registry.contains("a").await);

        drop(snapshot);
        assert!(inbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let registry = registry();

        let result = registry.remove("ghost").await;

        assert!(matches!(
            result,
            Err(Error::UnknownId { ref subscriber_id, message: None }) if subscriber_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        registry
            .register(Subscriber::new("a"), &shutdown)
            .await
            .unwrap();
        let snapshot = registry.snapshot().await;

        registry
            .register(Subscriber::new("b"), &shutdown)
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        for id in ["a", "b", "c"] {
            registry
                .register(Subscriber::new(id), &shutdown)
                .await
                .unwrap();
        }
        let snapshot = registry.snapshot().await;

        assert_eq!(registry.close_all().await, 3);
        assert!(registry.is_empty().await);
        assert!(snapshot.iter().all(SubscriberEntry::is_closed));
    }

    #[tokio::test]
    async fn test_close_all_ends_inboxes_with_live_senders() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        let mut inbox = registry
            .register(Subscriber::new("a"), &shutdown)
            .await
            .unwrap()
            .unwrap();
        // A delivery task still holding the entry must not keep the inbox open
        let held = registry.get("a").await.unwrap();

        registry.close_all().await;

        assert!(held.is_closed());
        assert!(inbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_closes_supplied_inbox_despite_clones() {
        let registry = registry();
        let shutdown = CancellationToken::new();
        let (tx, mut rx) = inbox::channel(1);
        let kept = tx.clone();

        registry
            .register(Subscriber::new("a").with_inbox(tx), &shutdown)
            .await
            .unwrap();
        registry.remove("a").await.unwrap();

        assert!(kept.is_closed());
        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_ids() {
        let registry = registry();
        let shutdown = CancellationToken::new();

        registry
            .register(Subscriber::new("b"), &shutdown)
            .await
            .unwrap();
        registry
            .register(Subscriber::new("a"), &shutdown)
            .await
            .unwrap();

        let mut ids = registry.ids().await;
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
