//! Centralized defaults and well-known field names.
//!
//! This module consolidates the magic strings and default values used
//! throughout the millstream core. Having them in one place makes it easier
//! to:
//!
//! - Keep library defaults consistent with the documented contract
//! - Update values without hunting through components
//!
//! # Categories
//!
//! - **Naming Defaults**: stream, group, and consumer member names
//! - **Timing Defaults**: poll timeout and read retry delay
//! - **Envelope Fields**: field-map keys owned by the message envelope

// =============================================================================
// Naming Defaults
// =============================================================================

/// Default stream name used when none is configured.
pub const DEFAULT_STREAM_NAME: &str = "message-stream";

/// Default consumer group name used when none is configured.
pub const DEFAULT_GROUP_NAME: &str = "message-group";

/// Default consumer member name.
///
/// A single-instance deployment can keep this default. Deployments running
/// several processes against the same group must configure a distinct member
/// name per process, otherwise the log service cannot tell the readers'
/// pending entries apart.
pub const DEFAULT_CONSUMER_NAME: &str = "consumer-1";

// =============================================================================
// Timing Defaults
// =============================================================================

/// Default bounded wait for a blocking group read, in milliseconds.
///
/// Short enough that the consumer loop re-checks its stop signal at least
/// once a second while the stream is idle.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1_000;

/// Delay before retrying a failed group read, in milliseconds.
///
/// Keeps the consumer loop from spinning hot while the log service is
/// unreachable.
pub const READ_RETRY_DELAY_MS: u64 = 500;

// =============================================================================
// Envelope Fields
// =============================================================================

/// Field key (and value) of the synthetic entry appended at stream creation.
///
/// Group creation against a non-existent stream fails, so the bootstrapper
/// appends one placeholder entry first. The consumer loop acknowledges these
/// entries without dispatching them to the business handler.
pub const BOOTSTRAP_FIELD: &str = "init";

/// Field key holding a message's content.
pub const FIELD_CONTENT: &str = "content";

/// Field key holding a message's send timestamp, RFC 3339 encoded.
pub const FIELD_TIMESTAMP: &str = "timestamp";
