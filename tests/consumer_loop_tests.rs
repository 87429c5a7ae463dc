//! End-to-end tests for the consumer loop: ordered dispatch, acknowledgment
//! bookkeeping, failure isolation, and clean shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use millstream::bootstrap::ensure_ready;
use millstream::config::StreamConfig;
use millstream::consumer::{ConsumerLoop, MessageHandler};
use millstream::error::HandlerError;
use millstream::log::{
    CreateGroupOutcome, LogClient, LogEntry, LogError, LogResult, MemoryLog, ReadSelector,
    StartOffset,
};
use millstream::message::Message;
use millstream::producer::Producer;
use millstream::types::{ConsumerIdentity, EntryId, FieldMap};

/// Test configuration with a short poll timeout so the loops react quickly.
fn test_config() -> StreamConfig {
    StreamConfig {
        poll_timeout: Duration::from_millis(100),
        ..StreamConfig::default()
    }
}

/// Poll `cond` until it holds or the timeout expires.
async fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Records every handled message; optionally fails on one content value.
struct Recorder {
    seen: Mutex<Vec<Message>>,
    fail_on: Option<String>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail_on: None,
        })
    }

    fn failing_on(content: &str) -> Arc<Self> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail_on: Some(content.to_string()),
        })
    }

    fn contents(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let reject = self.fail_on.as_deref() == Some(message.content.as_str());
        self.seen.lock().unwrap().push(message);
        if reject {
            return Err(HandlerError::new("rejected by test handler"));
        }
        Ok(())
    }
}

/// Wraps [`MemoryLog`] to count acknowledgments and inject failures.
struct InstrumentedLog {
    inner: MemoryLog,
    ack_counts: Mutex<HashMap<EntryId, usize>>,
    fail_acks: AtomicBool,
    reads_to_fail: AtomicUsize,
}

impl InstrumentedLog {
    fn new() -> Self {
        InstrumentedLog {
            inner: MemoryLog::new(),
            ack_counts: Mutex::new(HashMap::new()),
            fail_acks: AtomicBool::new(false),
            reads_to_fail: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LogClient for InstrumentedLog {
    async fn append(&self, stream: &str, fields: FieldMap) -> LogResult<EntryId> {
        self.inner.append(stream, fields).await
    }

    async fn stream_exists(&self, stream: &str) -> LogResult<bool> {
        self.inner.stream_exists(stream).await
    }

    async fn create_group(
        &self,
        stream: &str,
        start: StartOffset,
        group: &str,
    ) -> LogResult<CreateGroupOutcome> {
        self.inner.create_group(stream, start, group).await
    }

    async fn read_as_group(
        &self,
        stream: &str,
        identity: &ConsumerIdentity,
        selector: ReadSelector,
        timeout: Duration,
    ) -> LogResult<Vec<LogEntry>> {
        if self
            .reads_to_fail
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LogError::Io(std::io::ErrorKind::ConnectionReset));
        }
        self.inner
            .read_as_group(stream, identity, selector, timeout)
            .await
    }

    async fn acknowledge(&self, stream: &str, group: &str, id: &EntryId) -> LogResult<()> {
        *self.ack_counts.lock().unwrap().entry(id.clone()).or_insert(0) += 1;
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(LogError::Io(std::io::ErrorKind::BrokenPipe));
        }
        self.inner.acknowledge(stream, group, id).await
    }
}

#[tokio::test]
async fn test_messages_are_delivered_in_append_order() {
    let config = test_config();
    let log = Arc::new(MemoryLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();

    let recorder = Recorder::new();
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("a")).await.unwrap();
    producer.send(Message::new("b")).await.unwrap();
    producer.send(Message::new("c")).await.unwrap();

    assert!(wait_for(|| recorder.count() == 3, Duration::from_secs(5)).await);
    handle.stop().await;

    // Delivered in append order, placeholder never reaches the handler.
    assert_eq!(recorder.contents(), vec!["a", "b", "c"]);

    // Entry ids are strictly increasing across the batch.
    {
        let seen = recorder.seen.lock().unwrap();
        let ids: Vec<EntryId> = seen.iter().map(|m| m.id.clone().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    // Everything acknowledged: nothing pending, nothing new.
    assert_eq!(log.pending_count(&config.stream, &config.group).await, 0);
    let remaining = log
        .read_as_group(
            &config.stream,
            &config.identity(),
            ReadSelector::New,
            Duration::from_millis(50),
        )
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_handler_failure_leaves_only_that_entry_pending() {
    let config = test_config();
    let log = Arc::new(MemoryLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();

    let recorder = Recorder::failing_on("b");
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("a")).await.unwrap();
    producer.send(Message::new("b")).await.unwrap();
    producer.send(Message::new("c")).await.unwrap();

    // The failing entry does not block the ones behind it.
    assert!(wait_for(|| recorder.count() == 3, Duration::from_secs(5)).await);
    handle.stop().await;
    assert_eq!(recorder.contents(), vec!["a", "b", "c"]);

    // Only the failed entry is still pending, and a redelivery-style read
    // returns exactly it.
    assert_eq!(log.pending_count(&config.stream, &config.group).await, 1);
    let pending = log
        .read_as_group(
            &config.stream,
            &config.identity(),
            ReadSelector::Pending,
            Duration::ZERO,
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].fields.get("content").map(String::as_str),
        Some("b")
    );
}

#[tokio::test]
async fn test_handler_success_acknowledges_exactly_once() {
    let config = test_config();
    let log = Arc::new(InstrumentedLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();

    let recorder = Recorder::new();
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("a")).await.unwrap();
    producer.send(Message::new("b")).await.unwrap();

    assert!(wait_for(|| recorder.count() == 2, Duration::from_secs(5)).await);
    handle.stop().await;

    // Placeholder plus the two messages: one acknowledge call each.
    let counts = log.ack_counts.lock().unwrap();
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&n| n == 1));
}

#[tokio::test]
async fn test_acknowledge_failure_does_not_stop_the_loop() {
    let config = test_config();
    let log = Arc::new(InstrumentedLog::new());

    // Create the stream and group without the bootstrap placeholder so the
    // pending set below contains only the two messages.
    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("a")).await.unwrap();
    log.create_group(&config.stream, StartOffset::Beginning, &config.group)
        .await
        .unwrap();
    log.fail_acks.store(true, Ordering::SeqCst);

    let recorder = Recorder::new();
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();
    producer.send(Message::new("b")).await.unwrap();

    assert!(wait_for(|| recorder.count() == 2, Duration::from_secs(5)).await);
    assert!(!handle.is_finished());
    handle.stop().await;

    // Handled but never acknowledged: both entries stay pending.
    assert_eq!(recorder.contents(), vec!["a", "b"]);
    assert_eq!(
        log.inner.pending_count(&config.stream, &config.group).await,
        2
    );
}

#[tokio::test]
async fn test_read_failures_back_off_and_recover() {
    let config = test_config();
    let log = Arc::new(InstrumentedLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();
    log.reads_to_fail.store(2, Ordering::SeqCst);

    let recorder = Recorder::new();
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("after outage")).await.unwrap();

    assert!(wait_for(|| recorder.count() == 1, Duration::from_secs(10)).await);
    handle.stop().await;
    assert_eq!(recorder.contents(), vec!["after outage"]);
}

#[tokio::test]
async fn test_undecodable_entry_is_left_pending_and_skipped() {
    let config = test_config();
    let log = Arc::new(MemoryLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();

    let recorder = Recorder::new();
    let handle = ConsumerLoop::new(log.clone(), config.clone(), recorder.clone()).spawn();

    let mut junk = FieldMap::new();
    junk.insert("garbage".to_string(), "?".to_string());
    log.append(&config.stream, junk).await.unwrap();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("good")).await.unwrap();

    assert!(wait_for(|| recorder.count() == 1, Duration::from_secs(5)).await);
    handle.stop().await;

    assert_eq!(recorder.contents(), vec!["good"]);
    assert_eq!(log.pending_count(&config.stream, &config.group).await, 1);
}

/// Handler that takes a while, to expose the shutdown path.
struct SlowHandler {
    started: AtomicBool,
    finished: AtomicBool,
}

#[async_trait]
impl MessageHandler for SlowHandler {
    async fn handle(&self, _message: Message) -> Result<(), HandlerError> {
        self.started.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_dispatch() {
    let config = test_config();
    let log = Arc::new(MemoryLog::new());
    ensure_ready(log.as_ref(), &config.stream, &config.group)
        .await
        .unwrap();

    let handler = Arc::new(SlowHandler {
        started: AtomicBool::new(false),
        finished: AtomicBool::new(false),
    });
    let handle = ConsumerLoop::new(log.clone(), config.clone(), handler.clone()).spawn();

    let producer = Producer::new(log.clone(), config.stream.clone());
    producer.send(Message::new("slow")).await.unwrap();

    assert!(
        wait_for(
            || handler.started.load(Ordering::SeqCst),
            Duration::from_secs(5)
        )
        .await
    );

    // Stop lands mid-handler: the dispatch must complete and be
    // acknowledged before the loop exits.
    handle.stop().await;
    assert!(handler.finished.load(Ordering::SeqCst));
    assert_eq!(log.pending_count(&config.stream, &config.group).await, 0);
}

#[tokio::test]
async fn test_two_groups_consume_the_same_stream_independently() {
    let config_a = test_config();
    let config_b = StreamConfig {
        group: "group-b".to_string(),
        ..test_config()
    };
    let log = Arc::new(MemoryLog::new());
    ensure_ready(log.as_ref(), &config_a.stream, &config_a.group)
        .await
        .unwrap();
    ensure_ready(log.as_ref(), &config_b.stream, &config_b.group)
        .await
        .unwrap();

    let recorder_a = Recorder::new();
    let recorder_b = Recorder::failing_on("x");
    let handle_a = ConsumerLoop::new(log.clone(), config_a.clone(), recorder_a.clone()).spawn();
    let handle_b = ConsumerLoop::new(log.clone(), config_b.clone(), recorder_b.clone()).spawn();

    let producer = Producer::new(log.clone(), config_a.stream.clone());
    producer.send(Message::new("x")).await.unwrap();
    producer.send(Message::new("y")).await.unwrap();

    assert!(
        wait_for(
            || recorder_a.count() == 2 && recorder_b.count() == 2,
            Duration::from_secs(5)
        )
        .await
    );
    handle_a.stop().await;
    handle_b.stop().await;

    // Both groups saw every message; group A acknowledged everything while
    // group B still has its failed entry pending.
    assert_eq!(recorder_a.contents(), vec!["x", "y"]);
    assert_eq!(recorder_b.contents(), vec!["x", "y"]);
    assert_eq!(log.pending_count(&config_a.stream, &config_a.group).await, 0);
    assert_eq!(log.pending_count(&config_b.stream, &config_b.group).await, 1);
}
