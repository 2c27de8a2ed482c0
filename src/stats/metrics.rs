//! Delivery statistics

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;

/// Point-in-time delivery statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Messages accepted by a subscriber
    pub delivered: u64,
    /// Attempts that hit the subscriber's deadline
    pub deadline_exceeded: u64,
    /// Attempts (or whole broadcasts) rejected by shutdown
    pub shutting_down: u64,
    /// Sends addressed to an unregistered subscriber
    pub unknown_subscriber: u64,
}

impl DeliveryStats {
    /// Total failed outcomes
    pub fn failed(&self) -> u64 {
        self.deadline_exceeded + self.shutting_down + self.unknown_subscriber
    }

    /// Fraction of outcomes that were successful deliveries
    pub fn success_ratio(&self) -> f64 {
        let total = self.delivered + self.failed();
        if total > 0 {
            self.delivered as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Lock-free counters shared by every delivery task
#[derive(Debug, Default)]
pub(crate) struct DeliveryCounters {
    delivered: AtomicU64,
    deadline_exceeded: AtomicU64,
    shutting_down: AtomicU64,
    unknown_subscriber: AtomicU64,
}

impl DeliveryCounters {
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, err: &Error) {
        let counter = match err {
            Error::PublishDeadline { .. } => &self.deadline_exceeded,
            Error::ShuttingDown { .. } => &self.shutting_down,
            Error::UnknownId { .. } => &self.unknown_subscriber,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            shutting_down: self.shutting_down.load(Ordering::Relaxed),
            unknown_subscriber: self.unknown_subscriber.load(Ordering::Relaxed),
        }
    }
}
