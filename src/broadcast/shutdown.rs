//! Once-only stop signal

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Process-wide stop signal shared by every delivery attempt.
///
/// Raised before the registry is drained, so anything that finds the registry
/// empty can tell a stopped broadcaster from a missing subscriber.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    token: CancellationToken,
    fired: AtomicBool,
}

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `false` if it had already been fired.
    pub(crate) fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait until the signal fires
    pub(crate) async fn triggered(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_once() {
        let stop = StopSignal::new();
        let child = stop.token().child_token();

        assert!(!stop.is_triggered());
        assert!(stop.trigger());
        assert!(!stop.trigger());
        assert!(stop.is_triggered());
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_triggered_wakes_waiters() {
        let stop = std::sync::Arc::new(StopSignal::new());
        let waiter = {
            let stop = std::sync::Arc::clone(&stop);
            tokio::spawn(async move { stop.triggered().await })
        };

        stop.trigger();

        let woken = tokio::time::timeout(std::time::Duration::from_secs(1), waiter).await;
        assert!(matches!(woken, Ok(Ok(()))));
    }
}
