//! Broker client trait for HERALD adapters
//!
//! The [`BrokerClient`] trait is the single seam between the publishing
//! layer and a concrete message broker. Connection management, partitioning
//! and compression all live behind it.

use crate::error::ProduceError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Delivery confirmation for one produced message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Topic the message landed on
    pub topic: String,
    /// Partition chosen by the broker, if the broker has partitions
    pub partition: Option<i32>,
    /// Offset within the partition, if known
    pub offset: Option<i64>,
}

impl DeliveryReport {
    /// Report for a broker without partition/offset semantics
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            offset: None,
        }
    }

    /// Attach partition and offset
    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = Some(partition);
        self.offset = Some(offset);
        self
    }
}

/// BrokerClient trait - sends single messages to a message bus
///
/// Native producer clients usually confirm delivery through a callback.
/// Adapters translate that callback into the future returned by
/// [`produce`](BrokerClient::produce), so retry logic above this trait never
/// sees transport details.
///
/// # Implementation Requirements
///
/// - Clients must be `Send + Sync`; one instance is shared by every
///   concurrent publish call
/// - `produce` resolves only once the broker confirmed (or refused) delivery
/// - `flush` must respect its timeout and report what is still unsent
///
/// # Example
///
/// ```ignore
/// use herald_core::{BrokerClient, DeliveryReport, ProduceError};
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// struct KafkaBroker {
///     producer: rdkafka::producer::FutureProducer,
/// }
///
/// #[async_trait]
/// impl BrokerClient for KafkaBroker {
///     fn name(&self) -> &'static str {
///         "kafka"
///     }
///
///     async fn produce(
///         &self,
///         topic: &str,
///         key: Option<&[u8]>,
///         value: Bytes,
///     ) -> Result<DeliveryReport, ProduceError> {
///         let mut record = rdkafka::producer::FutureRecord::<[u8], [u8]>::to(topic)
///             .payload(&value);
///         if let Some(key) = key {
///             record = record.key(key);
///         }
///         let (partition, offset) = self
///             .producer
///             .send(record, Duration::from_secs(0))
///             .await
///             .map_err(|(e, _)| ProduceError::Send(e.to_string()))?;
///         Ok(DeliveryReport::new(topic).at(partition, offset))
///     }
///
///     async fn flush(&self, timeout: Duration) -> usize {
///         let _ = self.producer.flush(timeout);
///         self.producer.in_flight_count() as usize
///     }
/// }
/// ```
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Returns the client's name for identification and logging
    ///
    /// Examples: "kafka", "redpanda", "memory", "stdout".
    fn name(&self) -> &'static str;

    /// Send one message and wait for the delivery confirmation
    ///
    /// # Arguments
    ///
    /// * `topic` - Destination topic
    /// * `key` - Optional partition key; per-key ordering is the broker's job
    /// * `value` - Serialized message bytes
    ///
    /// # Returns
    ///
    /// * `Ok(DeliveryReport)` - The broker acknowledged the message
    /// * `Err(ProduceError)` - The message was not delivered; callers may retry
    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        value: Bytes,
    ) -> Result<DeliveryReport, ProduceError>;

    /// Flush buffered messages, waiting at most `timeout`
    ///
    /// Returns the number of messages that are still unsent when the call
    /// returns. Zero means everything was delivered.
    async fn flush(&self, timeout: Duration) -> usize;

    /// Check if the broker is reachable and accepting messages
    ///
    /// Should be lightweight. The default implementation reports healthy for
    /// clients with no cheap way to probe the broker.
    async fn health(&self) -> bool {
        true
    }
}
