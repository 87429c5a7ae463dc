//! Crate level errors.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Transport Layer (`crate::log::LogError`)
//!
//! Errors reported by the durable log service itself: connectivity failures,
//! unknown streams or groups, a closed client.
//!
//! ## Component Layer (`crate::error`)
//!
//! - [`Error`]: what each core component surfaces to its caller, tagged by
//!   the operation that failed (bootstrap, send, acknowledge)
//! - [`HandlerError`]: business-logic failures raised by a message handler;
//!   these are recovered inside the consumer loop and never propagate
//!
//! ## Conversion
//!
//! Components wrap [`LogError`](crate::log::LogError) into the matching
//! [`Error`] variant at their boundary, so callers see which operation
//! failed without losing the transport cause.

use std::fmt;

use thiserror::Error as ThisError;

use crate::log::LogError;
use crate::types::EntryId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core components.
///
/// Each variant corresponds to one operation in the stream-consumption
/// lifecycle. Handler failures are deliberately absent: the consumer loop
/// recovers them locally (see [`HandlerError`]).
#[derive(Debug, ThisError)]
pub enum Error {
    /// Infrastructure failure during stream or group setup.
    ///
    /// "Group already exists" is not an error and never produces this
    /// variant. Fatal: callers should abort startup.
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[source] LogError),

    /// A message could not be appended to the stream.
    ///
    /// Propagated synchronously to the producer's caller; the producer does
    /// not retry.
    #[error("send failed: {0}")]
    Send(#[source] LogError),

    /// A message was rejected before reaching the log.
    #[error("send rejected: message content is empty")]
    EmptyMessage,

    /// Acknowledging a handled entry failed.
    ///
    /// Tolerable under at-least-once semantics: the entry stays pending and
    /// may be redelivered.
    #[error("acknowledge failed for entry {id}: {source}")]
    Acknowledge {
        /// The entry whose acknowledgment failed.
        id: EntryId,
        #[source]
        source: LogError,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Business-logic failure while processing one delivered entry.
///
/// Returned by [`MessageHandler::handle`](crate::consumer::MessageHandler::handle).
/// The consumer loop logs the failure and leaves the entry pending; it never
/// crashes the loop or blocks other entries.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Create a handler error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HandlerError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
