//! In-memory log service for tests and embedded use.
//!
//! This provides a full-featured in-memory implementation of [`LogClient`]
//! with real consumer-group semantics: ordered append-only streams,
//! per-group last-delivered cursors, per-member pending entry lists, and
//! blocking group reads with a bounded wait.
//!
//! # Usage
//!
//! ```rust
//! use millstream::log::{LogClient, MemoryLog};
//! use millstream::types::FieldMap;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let log = MemoryLog::new();
//! let mut fields = FieldMap::new();
//! fields.insert("content".to_string(), "hello".to_string());
//! let id = log.append("message-stream", fields).await.unwrap();
//! assert!(log.stream_exists("message-stream").await.unwrap());
//! # let _ = id;
//! # }
//! ```
//!
//! Entry ids follow the reference `<millis>-<seq>` shape, zero-padded so
//! that string comparison of ids matches assignment order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;

use super::client::{CreateGroupOutcome, LogClient, LogEntry, ReadSelector, StartOffset};
use super::error::{LogError, LogResult};
use crate::types::{ConsumerIdentity, EntryId, FieldMap};

/// A delivered-but-unacknowledged entry, tracked per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Member the entry was delivered to.
    pub consumer: String,
    /// Last delivery time.
    pub delivered_at: DateTime<Utc>,
    /// How many times the entry has been delivered.
    pub delivery_count: u64,
}

/// State of one consumer group on one stream.
#[derive(Debug, Default)]
struct GroupState {
    /// Index into the stream's entry vector of the next undelivered entry.
    next_index: usize,
    /// Pending entries keyed by id; BTreeMap keeps redelivery in id order.
    pending: BTreeMap<EntryId, PendingEntry>,
}

/// One append-only stream and its consumer groups.
#[derive(Debug, Default)]
struct StreamState {
    /// Entries in append order; ids are strictly increasing.
    entries: Vec<LogEntry>,
    /// Millisecond component of the most recently assigned id.
    last_ms: i64,
    /// Sequence component of the most recently assigned id.
    last_seq: u64,
    /// Consumer groups by name.
    groups: HashMap<String, GroupState>,
}

impl StreamState {
    /// Assign the next entry id: wall-clock millis plus a sequence number
    /// that disambiguates appends within the same millisecond. Ids never go
    /// backwards even if the clock does.
    fn next_id(&mut self) -> EntryId {
        let ms = Utc::now().timestamp_millis();
        if ms > self.last_ms {
            self.last_ms = ms;
            self.last_seq = 0;
        } else {
            self.last_seq += 1;
        }
        // Zero-padded so lexicographic order equals assignment order.
        EntryId::new(format!("{:013}-{:06}", self.last_ms, self.last_seq))
    }
}

/// In-memory log service implementing [`LogClient`].
///
/// Safe for concurrent use from any number of tasks. Blocked group reads
/// are woken when an entry is appended to any stream and re-check their own
/// stream, so a wait never outlives its timeout by more than scheduling
/// jitter.
#[derive(Debug, Default)]
pub struct MemoryLog {
    streams: RwLock<HashMap<String, StreamState>>,
    appended: Notify,
    closed: AtomicBool,
}

impl MemoryLog {
    /// Create an empty in-memory log service.
    pub fn new() -> Self {
        MemoryLog::default()
    }

    /// Close the client: every subsequent operation (and every blocked
    /// read) fails with [`LogError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.appended.notify_waiters();
    }

    /// Number of entries in the stream, 0 if the stream does not exist.
    pub async fn entry_count(&self, stream: &str) -> usize {
        self.streams
            .read()
            .await
            .get(stream)
            .map(|s| s.entries.len())
            .unwrap_or(0)
    }

    /// Number of pending entries across all members of the group, 0 if the
    /// stream or group does not exist. Read-only: does not bump delivery
    /// counts the way a [`ReadSelector::Pending`] read does.
    pub async fn pending_count(&self, stream: &str, group: &str) -> usize {
        self.streams
            .read()
            .await
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.pending.len())
            .unwrap_or(0)
    }

    /// Delivery bookkeeping for one pending entry, `None` if the entry is
    /// not pending in the group. Read-only, like [`pending_count`](Self::pending_count).
    pub async fn pending_entry(
        &self,
        stream: &str,
        group: &str,
        id: &EntryId,
    ) -> Option<PendingEntry> {
        self.streams
            .read()
            .await
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .and_then(|g| g.pending.get(id))
            .cloned()
    }

    fn ensure_open(&self) -> LogResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LogError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl LogClient for MemoryLog {
    async fn append(&self, stream: &str, fields: FieldMap) -> LogResult<EntryId> {
        self.ensure_open()?;
        let mut streams = self.streams.write().await;
        let state = streams.entry(stream.to_string()).or_default();
        let id = state.next_id();
        state.entries.push(LogEntry {
            id: id.clone(),
            fields,
        });
        drop(streams);
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn stream_exists(&self, stream: &str) -> LogResult<bool> {
        self.ensure_open()?;
        Ok(self.streams.read().await.contains_key(stream))
    }

    async fn create_group(
        &self,
        stream: &str,
        start: StartOffset,
        group: &str,
    ) -> LogResult<CreateGroupOutcome> {
        self.ensure_open()?;
        let mut streams = self.streams.write().await;
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| LogError::StreamNotFound(stream.to_string()))?;
        if state.groups.contains_key(group) {
            return Ok(CreateGroupOutcome::AlreadyExists);
        }
        let next_index = match start {
            StartOffset::Beginning => 0,
            StartOffset::End => state.entries.len(),
        };
        state.groups.insert(
            group.to_string(),
            GroupState {
                next_index,
                pending: BTreeMap::new(),
            },
        );
        Ok(CreateGroupOutcome::Created)
    }

    async fn read_as_group(
        &self,
        stream: &str,
        identity: &ConsumerIdentity,
        selector: ReadSelector,
        timeout: Duration,
    ) -> LogResult<Vec<LogEntry>> {
        let deadline = Instant::now() + timeout;
        loop {
            self.ensure_open()?;
            // The wakeup must be registered while the lock is still held,
            // otherwise an append between unlock and wait is missed.
            let notified = {
                let mut streams = self.streams.write().await;
                let state = streams
                    .get_mut(stream)
                    .ok_or_else(|| LogError::StreamNotFound(stream.to_string()))?;
                let StreamState {
                    entries, groups, ..
                } = &mut *state;
                let group_state =
                    groups
                        .get_mut(&identity.group)
                        .ok_or_else(|| LogError::GroupNotFound {
                            stream: stream.to_string(),
                            group: identity.group.clone(),
                        })?;

                match selector {
                    ReadSelector::Pending => {
                        let now = Utc::now();
                        let mut batch = Vec::new();
                        for (id, pending) in group_state.pending.iter_mut() {
                            if pending.consumer != identity.consumer {
                                continue;
                            }
                            pending.delivered_at = now;
                            pending.delivery_count += 1;
                            if let Some(found) = entries
                                .binary_search_by(|e| e.id.cmp(id))
                                .ok()
                                .map(|i| entries[i].clone())
                            {
                                batch.push(found);
                            }
                        }
                        return Ok(batch);
                    }
                    ReadSelector::New => {
                        if group_state.next_index < entries.len() {
                            let batch: Vec<LogEntry> =
                                entries[group_state.next_index..].to_vec();
                            let now = Utc::now();
                            for entry in &batch {
                                group_state.pending.insert(
                                    entry.id.clone(),
                                    PendingEntry {
                                        consumer: identity.consumer.clone(),
                                        delivered_at: now,
                                        delivery_count: 1,
                                    },
                                );
                            }
                            group_state.next_index = entries.len();
                            return Ok(batch);
                        }
                        let mut notified = Box::pin(self.appended.notified());
                        notified.as_mut().enable();
                        notified
                    }
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn acknowledge(&self, stream: &str, group: &str, id: &EntryId) -> LogResult<()> {
        self.ensure_open()?;
        let mut streams = self.streams.write().await;
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| LogError::StreamNotFound(stream.to_string()))?;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| LogError::GroupNotFound {
                stream: stream.to_string(),
                group: group.to_string(),
            })?;
        // Idempotent: removing an id that is not pending is a no-op.
        group_state.pending.remove(id);
        Ok(())
    }
}
