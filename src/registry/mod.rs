//! Subscriber registry
//!
//! The registry owns every live subscriber handle and the add/remove lifecycle.
//! Fan-out never iterates the map directly: it takes an owned snapshot and
//! releases the lock before spawning delivery tasks.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ entries: HashMap<Id,         │
//!                 │   SubscriberEntry {          │
//!                 │     inbox: InboxSender ──────┼── closed token
//!                 │     timeout,                 │   shared with Inbox
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │ snapshot()
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!      [delivery task]     [delivery task]     [delivery task]
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!      Inbox::recv()       Inbox::recv()       Inbox::recv()
//! ```
//!
//! # Zero-Copy Design
//!
//! Payloads are `bytes::Bytes`, so every delivery task shares the same
//! allocation; only the reference count is bumped per subscriber.

pub mod entry;
pub mod inbox;
pub mod store;

pub use entry::{Subscriber, SubscriberEntry};
pub use inbox::{Inbox, InboxSender};
pub use store::SubscriberRegistry;
