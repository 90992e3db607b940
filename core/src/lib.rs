//! herald-core - Core types for the HERALD event publisher
//!
//! This crate provides the foundational types shared between the publishing
//! layer and broker adapters:
//!
//! - [`EventEnvelope`] - the durable envelope every event travels in
//! - [`EnvelopeBuilder`] - stamps identity and provenance onto payloads
//! - [`BrokerClient`] trait - async single-message send primitive
//! - [`ProduceError`] - error type for broker operations
//! - [`metadata_keys`] - reserved metadata key constants
//!
//! # Why this crate exists
//!
//! Broker adapters (Kafka, Redpanda, NATS, ...) only need the trait and the
//! envelope. Keeping them here lets adapters live in their own crates
//! without depending on the whole publisher:
//!
//! ```text
//! herald-core ◄── herald-publisher
//!     ▲
//!     └────────── herald-kafka (adapter crate)
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

mod broker;
/// The event envelope and its builder
pub mod envelope;
mod error;
/// Reserved metadata key constants for HERALD envelopes
pub mod metadata_keys;

pub use broker::{BrokerClient, DeliveryReport};
pub use envelope::{EnvelopeBuilder, EventEnvelope, EventSource, Metadata};
pub use error::ProduceError;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    // ==========================================================================
    // ProduceError Tests
    // ==========================================================================

    #[test]
    fn test_produce_error_send_display() {
        let err = ProduceError::Send("queue full".to_string());
        assert_eq!(err.to_string(), "send failed: queue full");
    }

    #[test]
    fn test_produce_error_connection_display() {
        let err = ProduceError::Connection("DNS lookup failed".to_string());
        assert_eq!(err.to_string(), "connection error: DNS lookup failed");
    }

    #[test]
    fn test_produce_error_timeout_display() {
        let err = ProduceError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "delivery timed out after 5s");
    }

    #[test]
    fn test_produce_error_not_ready_display() {
        let err = ProduceError::NotReady;
        assert_eq!(err.to_string(), "broker client not ready");
    }

    #[test]
    fn test_produce_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProduceError>();
    }

    // ==========================================================================
    // BrokerClient Trait Tests
    // ==========================================================================

    /// Test broker that tracks calls for verification
    struct TestBroker {
        produce_count: AtomicU64,
        last_size: AtomicU64,
        pending: AtomicU64,
        healthy: AtomicBool,
    }

    impl TestBroker {
        fn new() -> Self {
            Self {
                produce_count: AtomicU64::new(0),
                last_size: AtomicU64::new(0),
                pending: AtomicU64::new(0),
                healthy: AtomicBool::new(true),
            }
        }
    }

    #[async_trait::async_trait]
    impl BrokerClient for TestBroker {
        fn name(&self) -> &'static str {
            "test"
        }

        async fn produce(
            &self,
            topic: &str,
            _key: Option<&[u8]>,
            value: Bytes,
        ) -> Result<DeliveryReport, ProduceError> {
            let offset = self.produce_count.fetch_add(1, Ordering::Relaxed);
            self.last_size.store(value.len() as u64, Ordering::Relaxed);
            Ok(DeliveryReport::new(topic).at(0, offset as i64))
        }

        async fn flush(&self, _timeout: Duration) -> usize {
            self.pending.load(Ordering::Relaxed) as usize
        }

        async fn health(&self) -> bool {
            self.healthy.load(Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn test_broker_produce_reports_offsets() {
        let broker = TestBroker::new();

        let first = broker.produce("t", None, Bytes::from_static(b"abc")).await;
        let second = broker.produce("t", Some(b"k"), Bytes::new()).await;

        assert_eq!(first, Ok(DeliveryReport::new("t").at(0, 0)));
        assert_eq!(second, Ok(DeliveryReport::new("t").at(0, 1)));
        assert_eq!(broker.last_size.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_broker_flush_reports_pending() {
        let broker = TestBroker::new();
        assert_eq!(broker.flush(Duration::from_millis(1)).await, 0);

        broker.pending.store(3, Ordering::Relaxed);
        assert_eq!(broker.flush(Duration::from_millis(1)).await, 3);
    }

    #[tokio::test]
    async fn test_broker_is_object_safe() {
        let broker: Arc<dyn BrokerClient> = Arc::new(TestBroker::new());

        assert_eq!(broker.name(), "test");
        assert!(broker.health().await);
        assert!(broker.produce("t", None, Bytes::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_broker_default_health_is_true() {
        struct MinimalBroker;

        #[async_trait::async_trait]
        impl BrokerClient for MinimalBroker {
            fn name(&self) -> &'static str {
                "minimal"
            }
            async fn produce(
                &self,
                _topic: &str,
                _key: Option<&[u8]>,
                _value: Bytes,
            ) -> Result<DeliveryReport, ProduceError> {
                Err(ProduceError::NotReady)
            }
            async fn flush(&self, _timeout: Duration) -> usize {
                0
            }
        }

        let broker = MinimalBroker;
        assert!(broker.health().await);
        assert_eq!(
            broker.produce("t", None, Bytes::new()).await,
            Err(ProduceError::NotReady)
        );
    }
}
