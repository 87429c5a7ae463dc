//! Stream consumption configuration.
//!
//! [`StreamConfig`] names the stream, the consumer group, and this
//! process's member identity, and bounds the consumer loop's blocking
//! reads. Defaults match the reference deployment; every field can be
//! overridden programmatically or from the environment.
//!
//! # Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `MILLSTREAM_STREAM` | `stream` | `message-stream` |
//! | `MILLSTREAM_GROUP` | `group` | `message-group` |
//! | `MILLSTREAM_CONSUMER` | `consumer` | `consumer-1` |
//! | `MILLSTREAM_POLL_TIMEOUT_MS` | `poll_timeout` | `1000` |

use std::time::Duration;

use crate::constants::{
    DEFAULT_CONSUMER_NAME, DEFAULT_GROUP_NAME, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_STREAM_NAME,
};
use crate::error::Error;
use crate::types::ConsumerIdentity;

/// Names and timing for one stream/group/member triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Stream to produce to and consume from.
    pub stream: String,
    /// Consumer group tracked for this process.
    pub group: String,
    /// This process's member name within the group.
    ///
    /// Must be unique per process instance sharing the group; the log
    /// service tracks pending entries per member, so colliding names make
    /// two instances shadow each other's deliveries.
    pub consumer: String,
    /// Bounded wait for each blocking group read.
    ///
    /// Also the consumer loop's stop-signal latency while the stream is
    /// idle.
    pub poll_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            stream: DEFAULT_STREAM_NAME.to_string(),
            group: DEFAULT_GROUP_NAME.to_string(),
            consumer: DEFAULT_CONSUMER_NAME.to_string(),
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
        }
    }
}

impl StreamConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Returns a configuration error if `MILLSTREAM_POLL_TIMEOUT_MS` is set
    /// but not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = StreamConfig::default();

        let stream = std::env::var("MILLSTREAM_STREAM").unwrap_or(defaults.stream);
        let group = std::env::var("MILLSTREAM_GROUP").unwrap_or(defaults.group);
        let consumer = std::env::var("MILLSTREAM_CONSUMER").unwrap_or(defaults.consumer);

        let poll_timeout = match std::env::var("MILLSTREAM_POLL_TIMEOUT_MS") {
            Ok(raw) => {
                let ms: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "MILLSTREAM_POLL_TIMEOUT_MS must be a positive integer, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => defaults.poll_timeout,
        };

        let config = StreamConfig {
            stream,
            group,
            consumer,
            poll_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the log service would reject or
    /// that would make the consumer loop misbehave.
    pub fn validate(&self) -> Result<(), Error> {
        if self.stream.is_empty() {
            return Err(Error::Config("stream name must not be empty".to_string()));
        }
        if self.group.is_empty() {
            return Err(Error::Config("group name must not be empty".to_string()));
        }
        if self.consumer.is_empty() {
            return Err(Error::Config(
                "consumer member name must not be empty".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(Error::Config(
                "poll timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// This configuration's reader identity.
    pub fn identity(&self) -> ConsumerIdentity {
        ConsumerIdentity::new(self.group.clone(), self.consumer.clone())
    }
}
