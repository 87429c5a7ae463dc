//! The message model and its field-map envelope.
//!
//! A [`Message`] is the domain record shared by the producer and the
//! consumer loop: content, a send timestamp, and (after append) the entry id
//! the log service assigned. On the wire it is a flat field map; see
//! [`Message::to_fields`] and [`Payload::decode`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::constants::{BOOTSTRAP_FIELD, FIELD_CONTENT, FIELD_TIMESTAMP};
use crate::types::{EntryId, FieldMap};

/// One domain message.
///
/// `timestamp` defaults to construction time and is overwritten with the
/// send time by the producer; caller-supplied values are never what ends up
/// in the stream. `id` is populated only after append, from the entry id
/// the log service assigned: it is derived, never part of the appended
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Entry id assigned by the log service; `None` until appended.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<EntryId>,
    /// The message text.
    pub content: String,
    /// Creation / send time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given content, stamped with the current
    /// time.
    pub fn new(content: impl Into<String>) -> Self {
        Message {
            id: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Serialize into the appended field map.
    ///
    /// The id is deliberately excluded: it does not exist before append and
    /// would be redundant after.
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(FIELD_CONTENT.to_string(), self.content.clone());
        fields.insert(FIELD_TIMESTAMP.to_string(), self.timestamp.to_rfc3339());
        fields
    }
}

/// Why an entry's field map could not be decoded into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DecodeError {
    /// A required envelope field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The timestamp field is present but not valid RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// A decoded stream entry.
///
/// Distinguishes the synthetic entry appended at stream creation from real
/// business messages, so the consumer loop can acknowledge the former
/// without dispatching it to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The stream-creation placeholder; carries no business data.
    Bootstrap,
    /// A business message, with `id` set to the delivering entry's id.
    Message(Message),
}

impl Payload {
    /// Decode a delivered entry's field map.
    pub fn decode(id: &EntryId, fields: &FieldMap) -> Result<Self, DecodeError> {
        if fields.contains_key(BOOTSTRAP_FIELD) {
            return Ok(Payload::Bootstrap);
        }
        let content = fields
            .get(FIELD_CONTENT)
            .ok_or(DecodeError::MissingField(FIELD_CONTENT))?;
        let raw_ts = fields
            .get(FIELD_TIMESTAMP)
            .ok_or(DecodeError::MissingField(FIELD_TIMESTAMP))?;
        let timestamp = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|_| DecodeError::InvalidTimestamp(raw_ts.clone()))?
            .with_timezone(&Utc);
        Ok(Payload::Message(Message {
            id: Some(id.clone()),
            content: content.clone(),
            timestamp,
        }))
    }
}
