//! Broadcast orchestration
//!
//! Fans each message out to the registry snapshot, one tokio task per
//! subscriber, and funnels every failure onto the error stream.
//!
//! # Delivery flow
//!
//! ```text
//!   broadcast(msg) ──► registry.snapshot() ──► spawn per entry
//!                                                  │
//!                                                  ▼
//!                         select! { inbox hand-off, deadline, stop, closed }
//!                                                  │
//!                          ok ◄────────────────────┴──────────► ErrorSink ──► ErrorStream
//! ```
//!
//! There is no ordering between subscribers, and no ordering between errors.

pub mod broadcaster;
pub(crate) mod delivery;
pub(crate) mod shutdown;
pub mod sink;

pub use broadcaster::Broadcaster;
pub use sink::ErrorStream;
