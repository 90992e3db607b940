//! In-memory broker
//!
//! Records every produced message per topic and can inject failures and
//! latency. Used by the test suites and by services that want to run the
//! publisher without a real broker.

use crate::broker::{BrokerClient, DeliveryReport, ProduceError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// A message the broker accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedMessage {
    /// Destination topic
    pub topic: String,
    /// Partition key, if one was given
    pub key: Option<Vec<u8>>,
    /// Message bytes
    pub value: Bytes,
    /// Position within the topic
    pub offset: i64,
}

impl ProducedMessage {
    /// Value as text (lossy)
    pub fn value_str(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Value parsed as JSON
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.value)
    }
}

/// In-memory broker with failure injection
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    messages: Mutex<Vec<ProducedMessage>>,
    offsets: Mutex<HashMap<String, i64>>,
    failing_topics: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    last_flush_timeout: Mutex<Option<Duration>>,
    fail_next: AtomicU32,
    fail_all: AtomicBool,
    unhealthy: AtomicBool,
    pending: AtomicUsize,
    produce_calls: AtomicU64,
}

impl InMemoryBroker {
    /// Create an empty broker that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` produce calls, whatever their topic
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every produce call until switched off
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Fail every produce call to `topic`
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing_topics.lock().insert(topic.into());
    }

    /// Delay every produce call by `delay` before answering
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of messages `flush` reports as unsent
    pub fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::SeqCst);
    }

    /// Value reported by `health`
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Produce calls seen, successful or not
    pub fn produce_calls(&self) -> u64 {
        self.produce_calls.load(Ordering::SeqCst)
    }

    /// Timeout passed to the most recent `flush`
    pub fn last_flush_timeout(&self) -> Option<Duration> {
        *self.last_flush_timeout.lock()
    }

    /// All accepted messages in arrival order
    pub fn messages(&self) -> Vec<ProducedMessage> {
        self.messages.lock().clone()
    }

    /// Accepted messages for one topic
    pub fn messages_for(&self, topic: &str) -> Vec<ProducedMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    fn should_fail(&self, topic: &str) -> bool {
        if self.fail_all.load(Ordering::SeqCst) || self.failing_topics.lock().contains(topic) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BrokerClient for InMemoryBroker {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        value: Bytes,
    ) -> Result<DeliveryReport, ProduceError> {
        self.produce_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail(topic) {
            return Err(ProduceError::Connection(format!("injected failure for {topic}")));
        }

        let offset = {
            let mut offsets = self.offsets.lock();
            let next = offsets.entry(topic.to_string()).or_insert(0);
            let offset = *next;
            *next += 1;
            offset
        };

        self.messages.lock().push(ProducedMessage {
            topic: topic.to_string(),
            key: key.map(<[u8]>::to_vec),
            value,
            offset,
        });

        Ok(DeliveryReport::new(topic).at(0, offset))
    }

    async fn flush(&self, timeout: Duration) -> usize {
        *self.last_flush_timeout.lock() = Some(timeout);
        self.pending.load(Ordering::SeqCst)
    }

    async fn health(&self) -> bool {
        !self.unhealthy.load(Ordering::SeqCst)
    }
}
