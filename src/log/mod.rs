//! The log client layer: a thin capability over the external durable log
//! service.
//!
//! Everything the core knows about the log service is expressed through the
//! [`LogClient`] trait: append an entry, check a stream exists, create a
//! consumer group, read as a group member, acknowledge a handled entry. The
//! stream itself (persistence format, replication, cross-process
//! coordination) is owned by the service behind the trait.
//!
//! # Available Implementations
//!
//! - [`MemoryLog`]: in-memory log service with full consumer-group
//!   semantics, used by the test suite and suitable for embedded or
//!   single-process use
//!
//! Production deployments implement [`LogClient`] over their log service of
//! choice (Redis Streams, NATS JetStream, and similar services map onto the
//! trait directly).

mod client;
mod error;
mod memory;

pub use client::{CreateGroupOutcome, LogClient, LogEntry, ReadSelector, StartOffset};
pub use error::{LogError, LogResult};
pub use memory::{MemoryLog, PendingEntry};
