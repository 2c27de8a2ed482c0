//! Error types
//!
//! A single taxonomy covers registration, removal and delivery failures.
//! Registration and removal errors are returned to the caller directly;
//! delivery errors only ever arrive through the [`ErrorStream`](crate::ErrorStream).

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// Subscriber ID reported by errors that do not concern a single subscriber
/// (for example a whole broadcast rejected during shutdown).
pub const NO_SUBSCRIBER_ID: &str = "-1";

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the broadcaster
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Registration attempted with an empty subscriber ID
    #[error("subscriber registration requires a non-empty unique ID")]
    MissingId,

    /// Registration attempted with an ID that is already live
    #[error("duplicate subscriber ID: {subscriber_id}")]
    DuplicateId {
        /// The conflicting ID
        subscriber_id: String,
    },

    /// No subscriber with this ID is registered
    #[error("unknown subscriber ID: {subscriber_id}")]
    UnknownId {
        /// The ID that was looked up
        subscriber_id: String,
        /// Payload of the rejected send, if the lookup came from `send_to`
        message: Option<Bytes>,
    },

    /// The subscriber did not accept the message before its deadline
    #[error("publish deadline of {timeout:?} exceeded for subscriber {subscriber_id}")]
    PublishDeadline {
        /// Target subscriber
        subscriber_id: String,
        /// Payload that was not delivered
        message: Bytes,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The broadcaster (or the target subscriber) was shut down
    #[error("broadcaster shutting down, message not delivered")]
    ShuttingDown {
        /// Target subscriber, or [`NO_SUBSCRIBER_ID`] for a whole broadcast
        subscriber_id: String,
        /// Payload that was not delivered
        message: Option<Bytes>,
        /// Whether the rejection applies to an entire broadcast
        full_broadcast: bool,
    },
}

impl Error {
    /// ID of the subscriber this error concerns.
    ///
    /// Returns [`NO_SUBSCRIBER_ID`] when the error is not tied to a single subscriber.
    pub fn subscriber_id(&self) -> &str {
        match self {
            Error::MissingId => NO_SUBSCRIBER_ID,
            Error::ShuttingDown {
                full_broadcast: true,
                ..
            } => NO_SUBSCRIBER_ID,
            Error::DuplicateId { subscriber_id }
            | Error::UnknownId { subscriber_id, .. }
            | Error::PublishDeadline { subscriber_id, .. }
            | Error::ShuttingDown { subscriber_id, .. } => subscriber_id.as_str(),
        }
    }

    /// Payload carried by the error, so callers can retry with `send_to`
    pub fn message(&self) -> Option<&Bytes> {
        match self {
            Error::PublishDeadline { message, .. } => Some(message),
            Error::UnknownId { message, .. } | Error::ShuttingDown { message, .. } => {
                message.as_ref()
            }
            Error::MissingId | Error::DuplicateId { .. } => None,
        }
    }

    /// Short stable label for log fields
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::MissingId => "missing_id",
            Error::DuplicateId { .. } => "duplicate_id",
            Error::UnknownId { .. } => "unknown_id",
            Error::PublishDeadline { .. } => "publish_deadline",
            Error::ShuttingDown { .. } => "shutting_down",
        }
    }

    pub(crate) fn shutting_down(subscriber_id: &str, message: Bytes) -> Self {
        Error::ShuttingDown {
            subscriber_id: subscriber_id.to_string(),
            message: Some(message),
            full_broadcast: false,
        }
    }
}
