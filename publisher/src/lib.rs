//! HERALD - reliable event publishing
//!
//! Wraps a broker client so services can fire domain events without
//! handling transient broker failures themselves.
//!
//! # Publish path
//!
//! ```text
//! PublishRequest ──► CircuitBreaker ──► EnvelopeBuilder ──► Serializer ──► RetryExecutor ──► BrokerClient
//!                                                              (sanitize)        │
//!                                                                                 └─► DeadLetterRouter
//! ```
//!
//! Every stage updates one shared [`MetricsRecorder`]; read it through
//! [`EventPublisher::metrics`].
//!
//! # Example
//!
//! ```no_run
//! use herald_publisher::{
//!     EventPublisher, InMemoryBroker, PatternSanitizer, PublishRequest, PublisherConfig,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> herald_publisher::Result<()> {
//! let publisher = EventPublisher::new(
//!     PublisherConfig::from_env()?,
//!     Arc::new(InMemoryBroker::new()),
//!     Arc::new(PatternSanitizer::new()),
//! )?;
//!
//! match publisher
//!     .publish(PublishRequest::new("intelligence.quality_assessed.v1", json!({"score": 0.92})))
//!     .await
//! {
//!     Ok(true) => {}
//!     Ok(false) => eprintln!("event dropped, see logs"),
//!     Err(open) => eprintln!("broker unavailable, retry in {:?}", open.retry_after),
//! }
//!
//! publisher.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod broker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod publisher;
pub mod resilience;
pub mod sanitize;
pub mod serializer;

pub use broker::{InMemoryBroker, ProducedMessage, StdoutBroker};
pub use config::PublisherConfig;
pub use error::{
    CircuitOpenError, DeadLetterError, PublisherError, Result, RetryExhausted, SerializationError,
};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use publisher::{EventPublisher, PublishRequest, PublisherBuilder};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, DeadLetterConfig, DeadLetterRecord,
    DeadLetterRouter, Retried, RetryExecutor, RetryPolicy,
};
pub use sanitize::{NoopSanitizer, PatternSanitizer, Sanitizer};
pub use serializer::Serializer;

// Core types, so most users only need this crate
pub use herald_core::{
    BrokerClient, DeliveryReport, EnvelopeBuilder, EventEnvelope, EventSource, Metadata,
    ProduceError, metadata_keys,
};
