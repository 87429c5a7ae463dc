//! Type-safe wrappers for stream primitives.
//!
//! These newtypes provide type safety to prevent mixing up the different
//! string-shaped identifiers the log service hands out, and pin down the
//! small amount of structure the core is allowed to rely on.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The field-map payload of one stream entry.
///
/// The log service stores entries as flat string-to-string maps; any richer
/// structure (timestamps, envelopes) is layered on top by
/// [`crate::message`].
pub type FieldMap = HashMap<String, String>;

/// Identifier of one entry within a stream, assigned by the log service at
/// append time.
///
/// Entry ids are opaque tokens owned by the log service (the reference
/// service uses a `<millis>-<seq>` shape). The core relies on exactly three
/// properties and nothing else:
///
/// - equality, for acknowledgment bookkeeping
/// - total ordering by string comparison, matching append order
/// - display, for logging
///
/// The internal structure of the token must not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap a raw id token handed out by the log service.
    pub fn new(raw: impl Into<String>) -> Self {
        EntryId(raw.into())
    }

    /// The raw token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntryId {
    fn from(raw: String) -> Self {
        EntryId(raw)
    }
}

impl From<&str> for EntryId {
    fn from(raw: &str) -> Self {
        EntryId(raw.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logical reader identity within a consumer group.
///
/// The log service tracks delivered-but-unacknowledged entries per member,
/// so two processes sharing a member name would silently steal each other's
/// pending entries. See
/// [`DEFAULT_CONSUMER_NAME`](crate::constants::DEFAULT_CONSUMER_NAME).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerIdentity {
    /// The consumer group this member reads for.
    pub group: String,
    /// The member's own name within the group.
    pub consumer: String,
}

impl ConsumerIdentity {
    /// Create an identity from a group and member name.
    pub fn new(group: impl Into<String>, consumer: impl Into<String>) -> Self {
        ConsumerIdentity {
            group: group.into(),
            consumer: consumer.into(),
        }
    }
}

impl fmt::Display for ConsumerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.consumer)
    }
}
