//! # fanout
//!
//! In-process publish/subscribe broadcaster.
//!
//! A [`Broadcaster`] accepts byte payloads and fans each one out concurrently to
//! every registered subscriber. Each delivery attempt races the hand-off against
//! the subscriber's own deadline and the broadcaster's stop signal; every failure
//! is reported on the [`ErrorStream`] returned by the constructor.
//!
//! ```no_run
//! use std::time::Duration;
//! use fanout::{Broadcaster, Subscriber};
//!
//! # async fn example() -> fanout::Result<()> {
//! let (broadcaster, mut errors) = Broadcaster::with_timeout(Duration::from_millis(50));
//!
//! let fast = broadcaster.subscribe("fast").await?;
//! let slow = broadcaster
//!     .register(Subscriber::new("slow").with_timeout(Duration::from_millis(10)))
//!     .await?;
//!
//! broadcaster.broadcast(&b"payload"[..]).await;
//!
//! while let Some(err) = errors.recv().await {
//!     // Retry, log, or drop
//!     println!("{} failed: {}", err.subscriber_id(), err);
//! }
//! # drop((fast, slow));
//! # Ok(())
//! # }
//! ```
//!
//! The error stream never closes while the broadcaster is alive and must be
//! drained; delivery tasks wait for room on it.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod registry;
pub mod stats;

pub use broadcast::{Broadcaster, ErrorStream};
pub use config::BroadcasterConfig;
pub use error::{Error, Result, NO_SUBSCRIBER_ID};
pub use registry::inbox::channel as inbox_channel;
pub use registry::{Inbox, InboxSender, Subscriber};
pub use stats::DeliveryStats;
