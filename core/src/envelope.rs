//! Event envelope for HERALD
//!
//! The [`EventEnvelope`] wraps an application payload with identity and
//! provenance fields so that every published event can be traced end to end.
//!
//! # Wire shape
//!
//! ```text
//! {
//!   "event_type": "intelligence.quality_assessed.v1",
//!   "correlation_id": "3fae...",
//!   "causation_id": null,
//!   "source": {"service": "intelligence", "instance_id": "i-1", "hostname": "host-a"},
//!   "metadata": {"operation_type": "quality_assessment"},
//!   "payload": { ... },
//!   "created_at": "2025-01-01T00:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Envelope metadata. Ordered so the rendered JSON is deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Identifies the publishing process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    /// Logical service name (e.g. "intelligence")
    pub service: String,
    /// Instance of the service (pod name, VM id, ...)
    pub instance_id: String,
    /// Host the instance runs on, when known
    pub hostname: Option<String>,
}

impl EventSource {
    /// Create a source without hostname
    pub fn new(service: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            instance_id: instance_id.into(),
            hostname: None,
        }
    }

    /// Set the hostname
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

/// One published unit of work
///
/// Envelopes are immutable once built: fields are read through accessors
/// and only [`EnvelopeBuilder`] constructs them.
///
/// # Example
///
/// ```
/// use herald_core::{EnvelopeBuilder, EventSource};
/// use serde_json::json;
///
/// let builder = EnvelopeBuilder::new(EventSource::new("intelligence", "i-1"));
/// let envelope = builder.build("quality.assessed.v1", json!({"score": 0.9}), None, None, None);
///
/// assert_eq!(envelope.event_type(), "quality.assessed.v1");
/// assert!(!envelope.correlation_id().is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<P = serde_json::Value> {
    event_type: String,
    correlation_id: Uuid,
    causation_id: Option<Uuid>,
    source: EventSource,
    metadata: Metadata,
    payload: P,
    created_at: DateTime<Utc>,
}

impl<P> EventEnvelope<P> {
    /// Event type, also the default topic name
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Correlation id propagated end to end for tracing
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Id of the event that caused this one, for event chains
    pub fn causation_id(&self) -> Option<Uuid> {
        self.causation_id
    }

    /// Publishing process
    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// Free-form metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Metadata value for `key`
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Business payload
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Construction time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consume the envelope and return its payload
    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Builds [`EventEnvelope`]s for one publishing process
///
/// Holds the [`EventSource`] stamped onto every envelope and optional
/// default metadata that caller metadata is merged over.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    source: EventSource,
    default_metadata: Metadata,
}

impl EnvelopeBuilder {
    /// Create a builder for the given source
    pub fn new(source: EventSource) -> Self {
        Self {
            source,
            default_metadata: Metadata::new(),
        }
    }

    /// Add metadata stamped on every envelope unless the caller overrides it
    pub fn with_default_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_metadata.insert(key.into(), value.into());
        self
    }

    /// The source stamped onto envelopes
    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// Wrap `payload` in a new envelope
    ///
    /// Never fails. A fresh v4 correlation id is generated when none is
    /// supplied, and `created_at` is the current time.
    pub fn build<P>(
        &self,
        event_type: impl Into<String>,
        payload: P,
        correlation_id: Option<Uuid>,
        causation_id: Option<Uuid>,
        metadata: Option<Metadata>,
    ) -> EventEnvelope<P> {
        let mut merged = self.default_metadata.clone();
        if let Some(metadata) = metadata {
            merged.extend(metadata);
        }

        EventEnvelope {
            event_type: event_type.into(),
            correlation_id: correlation_id.unwrap_or_else(Uuid::new_v4),
            causation_id,
            source: self.source.clone(),
            metadata: merged,
            payload,
            created_at: Utc::now(),
        }
    }
}
