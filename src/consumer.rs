//! The consumer loop: blocking group reads, handler dispatch, and
//! acknowledgment bookkeeping.
//!
//! One [`ConsumerLoop`] runs on a dedicated tokio task, started once after
//! [`bootstrap::ensure_ready`](crate::bootstrap::ensure_ready) succeeds.
//! Each poll cycle reads new entries as this process's group member,
//! dispatches them to the injected [`MessageHandler`] in delivered order,
//! and acknowledges each entry only after its handler returns success.
//!
//! # Failure Semantics
//!
//! - Handler failure: logged, entry left pending, loop continues with the
//!   next entry. Pending entries are redelivered only through an external
//!   reclaim mechanism (see [`ReadSelector::Pending`](crate::log::ReadSelector)).
//! - Acknowledge failure: logged; at-least-once semantics tolerate the
//!   resulting redelivery.
//! - Read failure: logged and retried after a short delay, so a log-service
//!   outage does not spin the loop hot.
//!
//! # Lifecycle
//!
//! [`ConsumerLoop::spawn`] returns a [`ConsumerHandle`]. Stopping is
//! observed only between reads, so in-flight dispatches always complete;
//! no entry is abandoned mid-handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::constants::READ_RETRY_DELAY_MS;
use crate::error::{Error, HandlerError};
use crate::log::{LogClient, LogEntry, ReadSelector};
use crate::message::{Message, Payload};
use crate::types::{ConsumerIdentity, EntryId};

/// Business handler for delivered messages.
///
/// Injected into the consumer loop at construction. Handler execution is
/// synchronous relative to acknowledgment: the loop acknowledges an entry
/// only after `handle` returns `Ok`.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one delivered message.
    ///
    /// Returning an error leaves the delivering entry pending; it does not
    /// stop the loop or block later entries.
    async fn handle(&self, message: Message) -> Result<(), HandlerError>;
}

/// Plain synchronous closures are handlers too.
#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(Message) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        (self)(message)
    }
}

/// The long-running consumption task for one group member.
pub struct ConsumerLoop {
    log: Arc<dyn LogClient>,
    config: StreamConfig,
    identity: ConsumerIdentity,
    handler: Arc<dyn MessageHandler>,
}

impl ConsumerLoop {
    /// Create a loop reading `config`'s stream as `config`'s group member,
    /// dispatching to `handler`.
    pub fn new(
        log: Arc<dyn LogClient>,
        config: StreamConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let identity = config.identity();
        ConsumerLoop {
            log,
            config,
            identity,
            handler,
        }
    }

    /// Start the loop on its own tokio task.
    ///
    /// The task runs until stopped through the returned handle. Dropping
    /// the handle without calling [`ConsumerHandle::stop`] also signals the
    /// loop to exit at the next poll boundary.
    pub fn spawn(self) -> ConsumerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        ConsumerHandle { stop_tx, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        info!(
            stream = %self.config.stream,
            identity = %self.identity,
            "consumer loop started"
        );

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            // The stop signal is raced only against the blocking read.
            // Once a batch is in hand, every entry in it is dispatched
            // before the signal is looked at again.
            let batch = tokio::select! {
                result = self.log.read_as_group(
                    &self.config.stream,
                    &self.identity,
                    ReadSelector::New,
                    self.config.poll_timeout,
                ) => result,
                _ = stop.changed() => break,
            };

            match batch {
                Ok(entries) => {
                    for entry in entries {
                        self.dispatch(entry).await;
                    }
                }
                Err(e) => {
                    error!(
                        stream = %self.config.stream,
                        error = %e,
                        "group read failed, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(READ_RETRY_DELAY_MS)) => {}
                        _ = stop.changed() => break,
                    }
                }
            }
        }

        info!(
            stream = %self.config.stream,
            identity = %self.identity,
            "consumer loop stopped"
        );
    }

    async fn dispatch(&self, entry: LogEntry) {
        match Payload::decode(&entry.id, &entry.fields) {
            Ok(Payload::Bootstrap) => {
                debug!(entry = %entry.id, "acknowledging placeholder entry");
                self.acknowledge(&entry.id).await;
            }
            Ok(Payload::Message(message)) => match self.handler.handle(message).await {
                Ok(()) => self.acknowledge(&entry.id).await,
                Err(e) => {
                    error!(
                        entry = %entry.id,
                        error = %e,
                        "handler failed, entry left pending"
                    );
                }
            },
            Err(e) => {
                // Redelivery cannot fix a garbled payload, but discarding
                // it silently would violate at-least-once bookkeeping, so
                // it stays pending like any other failure.
                error!(entry = %entry.id, error = %e, "undecodable entry left pending");
            }
        }
    }

    async fn acknowledge(&self, id: &EntryId) {
        if let Err(source) = self
            .log
            .acknowledge(&self.config.stream, &self.config.group, id)
            .await
        {
            let err = Error::Acknowledge {
                id: id.clone(),
                source,
            };
            warn!(error = %err, "entry may be redelivered");
        }
    }
}

/// Lifecycle handle for a spawned [`ConsumerLoop`].
pub struct ConsumerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal the loop to stop and wait for it to exit.
    ///
    /// In-flight dispatches from the current poll cycle complete first; the
    /// wait is bounded by the poll timeout plus whatever the handler itself
    /// takes.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!("consumer loop task panicked");
            }
        }
    }

    /// Whether the loop task has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
