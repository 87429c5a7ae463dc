//! Transport level errors reported by the log service.

use std::io;

use thiserror::Error as ThisError;

pub type LogResult<T> = std::result::Result<T, LogError>;

/// Errors reported by the durable log service.
///
/// These are the raw failure modes of the transport; the core components
/// wrap them into [`crate::error::Error`] variants at their boundaries.
///
/// "Group already exists" is deliberately not an error: group creation
/// reports it as a tagged success via
/// [`CreateGroupOutcome`](super::CreateGroupOutcome).
#[derive(Debug, Clone, ThisError)]
pub enum LogError {
    /// An error in the network or the service's own storage.
    #[error("IO error: {0:?}")]
    Io(io::ErrorKind),

    /// The named stream does not exist.
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// The named consumer group does not exist on the stream.
    #[error("consumer group not found: {group} on stream {stream}")]
    GroupNotFound {
        /// Stream the group was looked up on.
        stream: String,
        /// The missing group.
        group: String,
    },

    /// The service rejected an entry or an entry id.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// The client has been closed; no further operations are possible.
    #[error("log client closed")]
    Closed,
}

impl PartialEq for LogError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LogError::Io(a), LogError::Io(b)) => a == b,
            (LogError::StreamNotFound(a), LogError::StreamNotFound(b)) => a == b,
            (
                LogError::GroupNotFound {
                    stream: s1,
                    group: g1,
                },
                LogError::GroupNotFound {
                    stream: s2,
                    group: g2,
                },
            ) => s1 == s2 && g1 == g2,
            (LogError::InvalidEntry(a), LogError::InvalidEntry(b)) => a == b,
            (LogError::Closed, LogError::Closed) => true,
            _ => false,
        }
    }
}

impl Eq for LogError {}

impl From<io::Error> for LogError {
    fn from(e: io::Error) -> Self {
        LogError::Io(e.kind())
    }
}
