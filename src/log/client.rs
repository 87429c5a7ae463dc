//! The [`LogClient`] trait: the client-visible contract of the durable log
//! service.
//!
//! The trait is the seam between the core and the outside world. It exists
//! so that:
//!
//! - Different backends can sit behind the same consumption lifecycle
//! - The test suite can run against an in-memory service
//! - The core never implements its own locking: cross-process contention
//!   (notably concurrent group creation) is arbitrated by the service
//!
//! # Contract Notes
//!
//! - `append` assigns the entry id; ids are strictly increasing within a
//!   stream and are never chosen by the client.
//! - `create_group` reports "already exists" as a tagged success
//!   ([`CreateGroupOutcome::AlreadyExists`]), not as an error.
//! - `read_as_group` treats an expired wait as an empty result, never as an
//!   error.
//! - `acknowledge` is idempotent: acknowledging an entry that is not pending
//!   succeeds without effect.

use std::time::Duration;

use async_trait::async_trait;

use super::error::LogResult;
use crate::types::{ConsumerIdentity, EntryId, FieldMap};

/// One entry as returned by a group read: the service-assigned id plus the
/// field-map payload that was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Id assigned at append time.
    pub id: EntryId,
    /// The appended field map.
    pub fields: FieldMap,
}

/// Where a newly created consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// Deliver every entry from the start of the stream, including any
    /// already appended (offset "0" in the reference service).
    Beginning,
    /// Deliver only entries appended after group creation.
    End,
}

/// Which entries a group read selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSelector {
    /// Entries past the group's last-delivered cursor: each is delivered to
    /// exactly one member and recorded as pending for that member.
    New,
    /// This member's own pending entries, redelivered. The extension point
    /// for a reclaim sweep; also how tests observe unacknowledged entries.
    Pending,
}

/// Outcome of a group creation attempt.
///
/// An explicit tagged result instead of an "already exists" error that the
/// caller would have to string-match and swallow: re-creation is an
/// expected, successful outcome of concurrent bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateGroupOutcome {
    /// The group did not exist and was created.
    Created,
    /// The group already existed; nothing was changed.
    AlreadyExists,
}

/// Thin capability over the external durable log service.
///
/// Shared by the producer (appends) and the consumer loop (group reads and
/// acknowledgments); implementations must be safe for concurrent use.
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Append a field map to the stream, creating the stream if needed.
    ///
    /// Returns the id the service assigned to the new entry.
    async fn append(&self, stream: &str, fields: FieldMap) -> LogResult<EntryId>;

    /// Whether the named stream exists.
    async fn stream_exists(&self, stream: &str) -> LogResult<bool>;

    /// Create a consumer group on the stream.
    ///
    /// Fails with [`LogError::StreamNotFound`](super::LogError::StreamNotFound)
    /// if the stream does not exist. Creation of a group that already exists
    /// is a no-op reported as [`CreateGroupOutcome::AlreadyExists`].
    async fn create_group(
        &self,
        stream: &str,
        start: StartOffset,
        group: &str,
    ) -> LogResult<CreateGroupOutcome>;

    /// Read entries as a group member, blocking up to `timeout`.
    ///
    /// Entries are returned in stream order. An empty result means the wait
    /// expired with nothing to deliver; it is not an error. Entries selected
    /// by [`ReadSelector::New`] become pending for `identity` until
    /// acknowledged.
    async fn read_as_group(
        &self,
        stream: &str,
        identity: &ConsumerIdentity,
        selector: ReadSelector,
        timeout: Duration,
    ) -> LogResult<Vec<LogEntry>>;

    /// Acknowledge a delivered entry, removing it from the group's pending
    /// set. Acknowledging an entry that is not pending succeeds without
    /// effect.
    async fn acknowledge(&self, stream: &str, group: &str, id: &EntryId) -> LogResult<()>;
}
