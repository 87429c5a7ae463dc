//! Appending messages to the stream.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::log::LogClient;
use crate::message::Message;
use crate::types::EntryId;

/// Serializes messages and appends them to the configured stream.
///
/// Stateless and cheap to clone; safe to invoke concurrently from any
/// number of tasks. Exactly one append per [`send`](Producer::send): no
/// batching and no deduplication, so duplicate sends with identical content
/// produce distinct entries.
#[derive(Clone)]
pub struct Producer {
    log: Arc<dyn LogClient>,
    stream: String,
}

impl Producer {
    /// Create a producer appending to `stream`.
    pub fn new(log: Arc<dyn LogClient>, stream: impl Into<String>) -> Self {
        Producer {
            log,
            stream: stream.into(),
        }
    }

    /// The stream this producer appends to.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Append one message, returning the entry id the log service assigned.
    ///
    /// The message's timestamp is overwritten with the current time: send
    /// time is authoritative, caller-supplied timestamps are ignored. Empty
    /// content is rejected before touching the log. Log failures are
    /// wrapped into [`Error::Send`] and propagated without retry; retry
    /// policy belongs to the caller.
    pub async fn send(&self, mut message: Message) -> Result<EntryId> {
        if message.content.is_empty() {
            return Err(Error::EmptyMessage);
        }
        message.timestamp = Utc::now();

        let id = self
            .log
            .append(&self.stream, message.to_fields())
            .await
            .map_err(Error::Send)?;
        info!(stream = %self.stream, entry = %id, "message appended");
        Ok(id)
    }
}
