//! Idempotent stream and consumer group bootstrap.
//!
//! [`ensure_ready`] runs once at process start, before the consumer loop
//! takes its first read. It may also run concurrently from several
//! processes sharing the same stream: every pre-existing-state outcome is a
//! success, and only genuine infrastructure failures propagate.

use tracing::info;

use crate::constants::BOOTSTRAP_FIELD;
use crate::error::{Error, Result};
use crate::log::{CreateGroupOutcome, LogClient, StartOffset};
use crate::types::FieldMap;

/// Ensure the stream and the consumer group exist.
///
/// - If the stream is absent, appends one synthetic placeholder entry so
///   the stream exists with at least one entry (group creation against a
///   non-existent stream fails). The placeholder is delivered once to each
///   group created from the beginning and acknowledged without reaching a
///   business handler.
/// - Creates the group from the beginning of the stream. A group that
///   already exists is logged and treated as success.
///
/// Safe to call repeatedly and from multiple processes at once; errors only
/// on infrastructure failure, never on pre-existing state.
pub async fn ensure_ready(log: &dyn LogClient, stream: &str, group: &str) -> Result<()> {
    if !log.stream_exists(stream).await.map_err(Error::Bootstrap)? {
        let mut fields = FieldMap::new();
        fields.insert(BOOTSTRAP_FIELD.to_string(), BOOTSTRAP_FIELD.to_string());
        let id = log.append(stream, fields).await.map_err(Error::Bootstrap)?;
        info!(stream, entry = %id, "created stream with placeholder entry");
    }

    match log
        .create_group(stream, StartOffset::Beginning, group)
        .await
        .map_err(Error::Bootstrap)?
    {
        CreateGroupOutcome::Created => info!(stream, group, "created consumer group"),
        CreateGroupOutcome::AlreadyExists => {
            info!(stream, group, "consumer group already exists")
        }
    }

    Ok(())
}
