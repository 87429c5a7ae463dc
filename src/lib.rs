//! # Millstream
//! Minimal at-least-once message streaming over a durable ordered log.
//!
//! Producers append records to an append-only stream; one or more consumer
//! groups independently track their own read position and acknowledge
//! processed entries. The crate owns the stream-consumption lifecycle
//! (idempotent stream/group bootstrap, blocking delivery of unacknowledged
//! entries, and the acknowledgment bookkeeping that determines redelivery)
//! while the durable log itself stays behind the
//! [`LogClient`](log::LogClient) trait.
//!
//! # Goals
//! - At-least-once delivery per consumer group, with explicit pending-entry
//!   bookkeeping
//! - Idempotent bootstrap that tolerates concurrent startup across processes
//! - A handler seam injected at construction, never registered globally
//! - Backend-agnostic: anything shaped like a stream service with consumer
//!   groups (Redis Streams, NATS JetStream) fits behind the client trait
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use millstream::bootstrap::ensure_ready;
//! use millstream::config::StreamConfig;
//! use millstream::consumer::ConsumerLoop;
//! use millstream::error::HandlerError;
//! use millstream::log::MemoryLog;
//! use millstream::message::Message;
//! use millstream::producer::Producer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StreamConfig::default();
//!     let log = Arc::new(MemoryLog::new());
//!
//!     ensure_ready(log.as_ref(), &config.stream, &config.group).await?;
//!
//!     let handler = Arc::new(|message: Message| -> Result<(), HandlerError> {
//!         println!("received: {}", message.content);
//!         Ok(())
//!     });
//!     let consumer = ConsumerLoop::new(log.clone(), config.clone(), handler).spawn();
//!
//!     let producer = Producer::new(log, &config.stream);
//!     let id = producer.send(Message::new("hello")).await?;
//!     println!("appended as {}", id);
//!
//!     consumer.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! Production deployments implement [`LogClient`](log::LogClient) over
//! their log service and hand it to the same components; the in-memory
//! service ships for tests and embedded use.

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod consumer;
pub mod error;
pub mod log;
pub mod message;
pub mod producer;
pub mod telemetry;
pub mod types;

pub mod prelude {
    //! Main exports for hosts wiring up the consumption lifecycle.

    pub use crate::bootstrap::ensure_ready;
    pub use crate::config::StreamConfig;
    pub use crate::consumer::{ConsumerHandle, ConsumerLoop, MessageHandler};
    pub use crate::error::{Error, HandlerError, Result};
    pub use crate::log::{CreateGroupOutcome, LogClient, LogEntry, MemoryLog, ReadSelector};
    pub use crate::message::{Message, Payload};
    pub use crate::producer::Producer;
    pub use crate::types::{ConsumerIdentity, EntryId, FieldMap};
}
