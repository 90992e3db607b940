//! Event publisher
//!
//! Composes envelope building, serialization, circuit breaking, retry and
//! dead-letter routing into one `publish` / `close` contract:
//!
//! ```text
//! publish ──► breaker gate ──► envelope ──► serialize+sanitize ──► retry(produce)
//!                 │                               │                    │      │
//!          CircuitOpenError                 Ok(false)            Ok(true)  Ok(false)
//!                                        (no broker I/O)                  + dead-letter
//! ```
//!
//! Only [`CircuitOpenError`] is returned as an error. Every other failure is
//! absorbed and reported as `Ok(false)`, with details in logs and metrics.

use crate::broker::BrokerClient;
use crate::config::PublisherConfig;
use crate::error::{CircuitOpenError, Result};
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::resilience::{
    CircuitBreaker, CircuitState, DeadLetterConfig, DeadLetterRouter, RetryExecutor,
};
use crate::sanitize::{PatternSanitizer, Sanitizer};
use crate::serializer::Serializer;
use herald_core::{EnvelopeBuilder, Metadata, metadata_keys};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// One event to publish
///
/// # Example
///
/// ```
/// use herald_publisher::PublishRequest;
/// use serde_json::json;
///
/// let request = PublishRequest::new("intelligence.quality_assessed.v1", json!({"score": 0.9}))
///     .metadata("operation_type", "quality_assessment")
///     .partition_key("doc-42");
/// assert_eq!(request.event_type(), "intelligence.quality_assessed.v1");
/// ```
#[derive(Debug, Clone)]
pub struct PublishRequest<P = serde_json::Value> {
    event_type: String,
    payload: P,
    correlation_id: Option<Uuid>,
    causation_id: Option<Uuid>,
    metadata: Option<Metadata>,
    topic: Option<String>,
    partition_key: Option<Vec<u8>>,
}

impl<P> PublishRequest<P> {
    /// Request for `payload` under `event_type`
    pub fn new(event_type: impl Into<String>, payload: P) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            correlation_id: None,
            causation_id: None,
            metadata: None,
            topic: None,
            partition_key: None,
        }
    }

    /// Propagate an existing correlation id instead of generating one
    pub fn correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Id of the event that caused this one
    pub fn causation_id(mut self, id: Uuid) -> Self {
        self.causation_id = Some(id);
        self
    }

    /// Add one metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Publish to `topic` instead of the event type
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Partition key handed to the broker
    pub fn partition_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// The event type
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Topic the request will be published to
    pub fn effective_topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(&self.event_type)
    }
}

/// Reliable publisher shared by every caller in a process
///
/// `Send + Sync`; wrap it in an `Arc` and call [`publish`](Self::publish)
/// from as many tasks as needed. Breaker state and metrics are shared by all
/// of them.
pub struct EventPublisher {
    config: PublisherConfig,
    broker: Arc<dyn BrokerClient>,
    envelopes: EnvelopeBuilder,
    serializer: Serializer,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    dead_letters: Option<DeadLetterRouter>,
    metrics: Arc<MetricsRecorder>,
}

impl EventPublisher {
    /// Publisher redacting with `sanitizer` (when sanitization is enabled)
    pub fn new(
        config: PublisherConfig,
        broker: Arc<dyn BrokerClient>,
        sanitizer: Arc<dyn Sanitizer>,
    ) -> Result<Self> {
        Self::builder(broker)
            .config(config)
            .sanitizer(sanitizer)
            .build()
    }

    /// Start building a publisher around `broker`
    ///
    /// Defaults: [`PublisherConfig::default`] and a [`PatternSanitizer`].
    pub fn builder(broker: Arc<dyn BrokerClient>) -> PublisherBuilder {
        PublisherBuilder {
            broker,
            config: PublisherConfig::default(),
            sanitizer: Arc::new(PatternSanitizer::new()),
            default_metadata: Metadata::new(),
        }
    }

    /// Publish one event
    ///
    /// Returns `Ok(true)` once the broker confirmed delivery and `Ok(false)`
    /// when the event was dropped (serialization failure, or retries
    /// exhausted; in the latter case a dead-letter record is attempted).
    ///
    /// # Errors
    ///
    /// [`CircuitOpenError`] when the breaker is open and its cooldown has not
    /// elapsed. Nothing is built, sent or counted in that case.
    pub async fn publish<P: Serialize>(
        &self,
        request: PublishRequest<P>,
    ) -> std::result::Result<bool, CircuitOpenError> {
        if let Err(e) = self.breaker.check() {
            tracing::warn!(
                event_type = %request.event_type,
                consecutive_failures = e.consecutive_failures,
                retry_after_ms = e.retry_after.as_millis() as u64,
                "circuit breaker open, rejecting publish"
            );
            return Err(e);
        }

        let started = Instant::now();
        let PublishRequest {
            event_type,
            payload,
            correlation_id,
            causation_id,
            metadata,
            topic,
            partition_key,
        } = request;

        let topic = topic.unwrap_or_else(|| event_type.clone());
        let (rendered, correlation_id, trace_id) = {
            let envelope = self.envelopes.build(
                event_type.as_str(),
                payload,
                correlation_id,
                causation_id,
                metadata,
            );
            let trace_id = envelope
                .metadata_value(metadata_keys::TRACE_ID)
                .map(str::to_string);
            (
                self.serializer.serialize(&envelope),
                envelope.correlation_id(),
                trace_id,
            )
        };

        let bytes = match rendered {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_failed();
                self.breaker.record_failure();
                tracing::error!(
                    event_type = %event_type,
                    topic = %topic,
                    correlation_id = %correlation_id,
                    trace_id = trace_id.as_deref(),
                    error = %e,
                    "envelope serialization failed, event dropped"
                );
                return Ok(false);
            }
        };

        let key = partition_key.as_deref();
        let outcome = self
            .retry
            .execute(|_| self.broker.produce(&topic, key, bytes.clone()))
            .await;

        match outcome {
            Ok(delivered) => {
                let latency = started.elapsed();
                self.metrics.record_published(latency);
                self.breaker.record_success();
                tracing::debug!(
                    event_type = %event_type,
                    topic = %topic,
                    correlation_id = %correlation_id,
                    trace_id = trace_id.as_deref(),
                    retries = delivered.retries,
                    partition = delivered.value.partition,
                    offset = delivered.value.offset,
                    latency_ms = latency.as_millis() as u64,
                    "event published"
                );
                Ok(true)
            }
            Err(exhausted) => {
                self.metrics.record_failed();
                self.breaker.record_failure();
                tracing::error!(
                    event_type = %event_type,
                    topic = %topic,
                    correlation_id = %correlation_id,
                    trace_id = trace_id.as_deref(),
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "event publish failed after retries"
                );

                if let Some(router) = &self.dead_letters {
                    // Outcome is logged and counted by the router.
                    let _ = router
                        .route(
                            &topic,
                            key,
                            &bytes,
                            &exhausted.last_error.to_string(),
                            exhausted.attempts,
                        )
                        .await;
                }
                Ok(false)
            }
        }
    }

    /// Flush the broker client, waiting at most the configured close timeout
    ///
    /// Never fails; unflushed messages are logged.
    pub async fn close(&self) {
        let timeout = self.config.close_timeout();
        match tokio::time::timeout(timeout, self.broker.flush(timeout)).await {
            Ok(0) => tracing::info!(broker = self.broker.name(), "publisher closed"),
            Ok(remaining) => tracing::warn!(
                broker = self.broker.name(),
                remaining = remaining,
                "publisher closed with unflushed messages"
            ),
            Err(_) => tracing::warn!(
                broker = self.broker.name(),
                timeout_ms = timeout.as_millis() as u64,
                "broker flush did not finish before close timeout"
            ),
        }
    }

    /// Snapshot of this publisher's metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.breaker.state())
    }

    /// Metrics in Prometheus text format, labelled with the service name
    pub fn encode_prometheus(&self) -> Result<String> {
        self.metrics().encode_prometheus(&self.config.service_name)
    }

    /// Unhealthy while the breaker is open, otherwise the broker's health
    pub async fn health(&self) -> bool {
        match self.breaker.state() {
            CircuitState::Open => false,
            CircuitState::Closed => self.broker.health().await,
        }
    }

    /// The publisher's circuit breaker (for monitoring)
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Active configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }
}

/// Builder for [`EventPublisher`]
///
/// ```ignore
/// let publisher = EventPublisher::builder(broker)
///     .config(PublisherConfig::from_env()?)
///     .sanitizer(Arc::new(PatternSanitizer::new()))
///     .default_metadata("operation_type", "quality_assessment")
///     .build()?;
/// ```
pub struct PublisherBuilder {
    broker: Arc<dyn BrokerClient>,
    config: PublisherConfig,
    sanitizer: Arc<dyn Sanitizer>,
    default_metadata: Metadata,
}

impl PublisherBuilder {
    /// Use `config` instead of the defaults
    pub fn config(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`PatternSanitizer`]
    pub fn sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Metadata stamped on every envelope unless a request overrides it
    pub fn default_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_metadata.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration and assemble the publisher
    pub fn build(self) -> Result<EventPublisher> {
        let config = self.config;
        config.validate()?;

        let metrics = Arc::new(MetricsRecorder::new());
        let serializer = Serializer::new(self.sanitizer, config.enable_sanitization);

        let mut envelopes = EnvelopeBuilder::new(config.source());
        for (key, value) in self.default_metadata {
            envelopes = envelopes.with_default_metadata(key, value);
        }

        let dead_letters = config.enable_dlq.then(|| {
            DeadLetterRouter::new(
                Arc::clone(&self.broker),
                serializer.clone(),
                config.source(),
                DeadLetterConfig {
                    suffix: config.dlq_suffix.clone(),
                    timeout: config.dlq_timeout(),
                },
                Arc::clone(&metrics),
            )
        });

        tracing::debug!(
            broker = self.broker.name(),
            service = %config.service_name,
            max_attempts = config.max_attempts,
            circuit_breaker_threshold = config.circuit_breaker_threshold,
            enable_dlq = config.enable_dlq,
            enable_sanitization = config.enable_sanitization,
            "event publisher created"
        );

        Ok(EventPublisher {
            breaker: CircuitBreaker::new(config.circuit_breaker(), Arc::clone(&metrics)),
            retry: RetryExecutor::new(config.retry_policy(), Arc::clone(&metrics)),
            broker: self.broker,
            envelopes,
            serializer,
            dead_letters,
            metrics,
            config,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::error::PublisherError;
    use crate::sanitize::NoopSanitizer;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn fast_config() -> PublisherConfig {
        PublisherConfig {
            max_attempts: 3,
            base_backoff_ms: 1,
            circuit_breaker_threshold: 5,
            service_name: "intelligence".into(),
            instance_id: "i-1".into(),
            ..Default::default()
        }
    }

    fn publisher(config: PublisherConfig) -> (EventPublisher, Arc<InMemoryBroker>) {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher =
            EventPublisher::new(config, broker.clone(), Arc::new(PatternSanitizer::new()))
                .unwrap();
        (publisher, broker)
    }

    #[test]
    fn test_request_effective_topic() {
        let req = PublishRequest::new("orders.created", json!({}));
        assert_eq!(req.effective_topic(), "orders.created");
        assert_eq!(req.topic("orders").effective_topic(), "orders");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let broker = Arc::new(InMemoryBroker::new());
        let config = PublisherConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            EventPublisher::new(config, broker, Arc::new(NoopSanitizer)),
            Err(PublisherError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_delivers_envelope_to_event_type_topic() {
        let (p, broker) = publisher(fast_config());
        let correlation = Uuid::new_v4();

        let ok = p
            .publish(
                PublishRequest::new("quality.assessed", json!({"score": 0.9}))
                    .correlation_id(correlation)
                    .metadata("operation_type", "quality_assessment")
                    .partition_key("doc-1"),
            )
            .await
            .unwrap();

        assert!(ok);
        let sent = broker.messages_for("quality.assessed");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key.as_deref(), Some(&b"doc-1"[..]));

        let value = sent[0].json().unwrap();
        assert_eq!(value["correlation_id"], correlation.to_string());
        assert_eq!(value["metadata"]["operation_type"], "quality_assessment");
        assert_eq!(value["source"]["service"], "intelligence");
        assert_eq!(value["payload"]["score"], 0.9);

        let m = p.metrics();
        assert_eq!(m.published, 1);
        assert_eq!(m.failed, 0);
        assert_eq!(m.circuit_state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_publish_uses_explicit_topic() {
        let (p, broker) = publisher(fast_config());

        assert!(
            p.publish(PublishRequest::new("a.b", json!(1)).topic("custom"))
                .await
                .unwrap()
        );
        assert_eq!(broker.messages_for("custom").len(), 1);
        assert!(broker.messages_for("a.b").is_empty());
    }

    #[tokio::test]
    async fn test_publish_recovers_after_transient_failures() {
        let (p, broker) = publisher(fast_config());
        broker.fail_next(2);

        assert!(p.publish(PublishRequest::new("t", json!({}))).await.unwrap());

        let m = p.metrics();
        assert_eq!(m.published, 1);
        assert_eq!(m.retries_attempted, 2);
        assert_eq!(broker.produce_calls(), 3);
        assert!(broker.messages_for("t.dlq").is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_publish_routes_to_dlq() {
        let (p, broker) = publisher(fast_config());
        broker.fail_topic("orders");

        let ok = p.publish(PublishRequest::new("orders", json!({"id": 1}))).await.unwrap();

        assert!(!ok);
        let dlq = broker.messages_for("orders.dlq");
        assert_eq!(dlq.len(), 1);
        let record = dlq[0].json().unwrap();
        assert_eq!(record["retry_count"], 3);
        assert_eq!(record["original_topic"], "orders");
        assert_eq!(record["original_envelope"]["payload"]["id"], 1);

        let m = p.metrics();
        assert_eq!(m.failed, 1);
        assert_eq!(m.sent_to_dlq, 1);
        assert_eq!(p.circuit_breaker().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_dlq_disabled_sends_nothing_extra() {
        let (p, broker) = publisher(PublisherConfig {
            enable_dlq: false,
            ..fast_config()
        });
        broker.fail_topic("orders");

        assert!(!p.publish(PublishRequest::new("orders", json!({}))).await.unwrap());
        assert_eq!(broker.produce_calls(), 3);
        assert_eq!(p.metrics().sent_to_dlq, 0);
    }

    #[tokio::test]
    async fn test_dlq_failure_is_not_propagated() {
        let (p, broker) = publisher(fast_config());
        broker.fail_all(true);

        assert!(!p.publish(PublishRequest::new("orders", json!({}))).await.unwrap());

        let m = p.metrics();
        assert_eq!(m.failed, 1);
        assert_eq!(m.dlq_failures, 1);
        // 3 attempts + 1 dead-letter attempt, no retry of the latter
        assert_eq!(broker.produce_calls(), 4);
    }

    #[tokio::test]
    async fn test_serialization_failure_short_circuits() {
        let (p, broker) = publisher(fast_config());
        let mut payload = HashMap::new();
        payload.insert(vec![1u8], "bad key");

        let ok = p.publish(PublishRequest::new("t", payload)).await.unwrap();

        assert!(!ok);
        assert_eq!(broker.produce_calls(), 0);
        let m = p.metrics();
        assert_eq!(m.failed, 1);
        assert_eq!(m.retries_attempted, 0);
        assert_eq!(m.sent_to_dlq, 0);
        assert_eq!(p.circuit_breaker().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_open_circuit_fails_fast() {
        let (p, broker) = publisher(PublisherConfig {
            circuit_breaker_threshold: 1,
            enable_dlq: false,
            ..fast_config()
        });
        broker.fail_all(true);

        assert!(!p.publish(PublishRequest::new("t", json!({}))).await.unwrap());
        let calls = broker.produce_calls();

        let err = p.publish(PublishRequest::new("t", json!({}))).await.unwrap_err();
        assert_eq!(err.consecutive_failures, 1);
        assert_eq!(broker.produce_calls(), calls);

        let m = p.metrics();
        assert_eq!(m.failed, 1);
        assert_eq!(m.circuit_opens, 1);
        assert_eq!(m.circuit_state, CircuitState::Open);
        assert!(!p.health().await);
    }

    #[tokio::test]
    async fn test_default_metadata_is_stamped() {
        let broker = Arc::new(InMemoryBroker::new());
        let p = EventPublisher::builder(broker.clone())
            .config(fast_config())
            .default_metadata("operation_type", "indexing")
            .build()
            .unwrap();

        p.publish(PublishRequest::new("t", json!({}))).await.unwrap();

        let value = broker.messages_for("t")[0].json().unwrap();
        assert_eq!(value["metadata"]["operation_type"], "indexing");
    }

    #[tokio::test]
    async fn test_custom_sanitizer_is_used() {
        let broker = Arc::new(InMemoryBroker::new());
        let p = EventPublisher::builder(broker.clone())
            .config(fast_config())
            .sanitizer(Arc::new(|text: &str| text.replace("classified", "[X]")))
            .build()
            .unwrap();

        p.publish(PublishRequest::new("t", json!({"note": "classified"})))
            .await
            .unwrap();

        assert!(!broker.messages_for("t")[0].value_str().contains("classified"));
    }

    #[tokio::test]
    async fn test_close_flushes_with_timeout() {
        let (p, broker) = publisher(fast_config());
        broker.set_pending(2);

        p.close().await;

        assert_eq!(broker.last_flush_timeout(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_health_follows_broker_when_closed() {
        let (p, broker) = publisher(fast_config());
        assert!(p.health().await);

        broker.set_healthy(false);
        assert!(!p.health().await);
    }

    #[tokio::test]
    async fn test_encode_prometheus_uses_service_label() {
        let (p, _) = publisher(fast_config());
        p.publish(PublishRequest::new("t", json!({}))).await.unwrap();

        let text = p.encode_prometheus().unwrap();
        assert!(text.contains("herald_events_published_total{service=\"intelligence\"} 1"));
    }
}
