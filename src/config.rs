//! Broadcaster configuration

use std::time::Duration;

/// Broadcaster configuration options
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Deadline applied to subscribers registered without their own timeout
    pub default_timeout: Duration,

    /// Capacity of inboxes created by the broadcaster
    pub inbox_capacity: usize,

    /// Capacity of the error stream
    ///
    /// Delivery tasks wait for room on this channel, so a consumer that stops
    /// draining errors will stall deliveries.
    pub error_capacity: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            inbox_capacity: 16,
            error_capacity: 1,
        }
    }
}

impl BroadcasterConfig {
    /// Create a new config with a custom default timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: timeout,
            ..Default::default()
        }
    }

    /// Set the default per-subscriber timeout
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the capacity of auto-created inboxes (minimum 1)
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity.max(1);
        self
    }

    /// Set the error stream capacity (minimum 1)
    pub fn error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity.max(1);
        self
    }
}
