//! Delivery statistics and counters

pub mod metrics;

pub use metrics::DeliveryStats;
pub(crate) use metrics::DeliveryCounters;
