//! Publish metrics for HERALD
//!
//! Plain counters behind one mutex, owned by a single publisher. Reads go
//! through [`MetricsRecorder::snapshot`]; rates and averages are derived on
//! demand from the snapshot. [`MetricsSnapshot::encode_prometheus`] renders
//! the Prometheus text exposition format for scraping.

use crate::error::{PublisherError, Result};
use crate::resilience::CircuitState;
use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    published: u64,
    failed: u64,
    sent_to_dlq: u64,
    dlq_failures: u64,
    retries_attempted: u64,
    circuit_opens: u64,
    latency_ms_total: f64,
}

/// Counters for one publisher, shared by all of its concurrent publishes
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    counters: Mutex<Counters>,
}

impl MetricsRecorder {
    /// Create a recorder with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered event and its publish latency
    pub fn record_published(&self, latency: Duration) {
        let mut c = self.counters.lock();
        c.published += 1;
        c.latency_ms_total += latency.as_secs_f64() * 1000.0;
    }

    /// Record an event that was dropped (serialization failure or retries exhausted)
    pub fn record_failed(&self) {
        self.counters.lock().failed += 1;
    }

    /// Record a dead-letter record the broker confirmed
    pub fn record_dlq_sent(&self) {
        self.counters.lock().sent_to_dlq += 1;
    }

    /// Record a dead-letter route that failed
    pub fn record_dlq_failure(&self) {
        self.counters.lock().dlq_failures += 1;
    }

    /// Record one retry actually taken
    pub fn record_retry(&self) {
        self.counters.lock().retries_attempted += 1;
    }

    /// Record a closed-to-open transition of the circuit breaker
    pub fn record_circuit_open(&self) {
        self.counters.lock().circuit_opens += 1;
    }

    /// Read-only view of the counters
    pub fn snapshot(&self, circuit_state: CircuitState) -> MetricsSnapshot {
        let c = self.counters.lock();
        let avg_latency_ms = if c.published == 0 {
            0.0
        } else {
            c.latency_ms_total / c.published as f64
        };

        MetricsSnapshot {
            published: c.published,
            failed: c.failed,
            sent_to_dlq: c.sent_to_dlq,
            dlq_failures: c.dlq_failures,
            retries_attempted: c.retries_attempted,
            circuit_opens: c.circuit_opens,
            avg_latency_ms,
            circuit_state,
        }
    }
}

/// Point-in-time copy of a publisher's metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Events delivered to the broker
    pub published: u64,
    /// Events dropped after serialization failure or retry exhaustion
    pub failed: u64,
    /// Dead-letter records confirmed by the broker
    pub sent_to_dlq: u64,
    /// Dead-letter routes that failed or timed out
    pub dlq_failures: u64,
    /// Retries taken across all publishes (first attempts not counted)
    pub retries_attempted: u64,
    /// Times the circuit breaker opened
    pub circuit_opens: u64,
    /// Mean publish latency of delivered events, in milliseconds
    pub avg_latency_ms: f64,
    /// Breaker state when the snapshot was taken
    pub circuit_state: CircuitState,
}

impl MetricsSnapshot {
    /// Events with a final outcome (delivered or dropped)
    pub fn total(&self) -> u64 {
        self.published + self.failed
    }

    /// Fraction of finished events that were delivered; 1.0 when idle
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => self.published as f64 / total as f64,
        }
    }

    /// Fraction of finished events that were dropped; 0.0 when idle
    pub fn failure_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.failed as f64 / total as f64,
        }
    }

    /// Render as Prometheus text exposition, labelled with `service`
    ///
    /// Uses a private registry per call so several publishers in one process
    /// never collide on metric names.
    pub fn encode_prometheus(&self, service: &str) -> Result<String> {
        let labels = HashMap::from([("service".to_string(), service.to_string())]);
        let registry = Registry::new_custom(Some("herald".to_string()), Some(labels))
            .map_err(|e| PublisherError::Metrics(format!("registry: {e}")))?;

        register_counter(
            &registry,
            "events_published_total",
            "Events delivered to the broker",
            self.published,
        )?;
        register_counter(
            &registry,
            "events_failed_total",
            "Events dropped after exhausting retries or failing to serialize",
            self.failed,
        )?;
        register_counter(
            &registry,
            "dlq_sent_total",
            "Dead-letter records confirmed by the broker",
            self.sent_to_dlq,
        )?;
        register_counter(
            &registry,
            "dlq_failures_total",
            "Dead-letter routes that failed",
            self.dlq_failures,
        )?;
        register_counter(
            &registry,
            "retries_total",
            "Retries taken across all publishes",
            self.retries_attempted,
        )?;
        register_counter(
            &registry,
            "circuit_opens_total",
            "Times the circuit breaker opened",
            self.circuit_opens,
        )?;
        register_gauge(
            &registry,
            "publish_latency_avg_ms",
            "Mean publish latency in milliseconds",
            self.avg_latency_ms,
        )?;
        register_gauge(
            &registry,
            "circuit_breaker_state",
            "Circuit breaker state (0 = closed, 1 = open)",
            self.circuit_state.as_metric_value(),
        )?;

        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .map_err(|e| PublisherError::Metrics(format!("encode: {e}")))?;
        String::from_utf8(buf).map_err(|e| PublisherError::Metrics(format!("utf8: {e}")))
    }
}

fn register_counter(registry: &Registry, name: &str, help: &str, value: u64) -> Result<()> {
    let counter = IntCounter::new(name, help)
        .map_err(|e| PublisherError::Metrics(format!("{name}: {e}")))?;
    counter.inc_by(value);
    registry
        .register(Box::new(counter))
        .map_err(|e| PublisherError::Metrics(format!("{name}: {e}")))
}

fn register_gauge(registry: &Registry, name: &str, help: &str, value: f64) -> Result<()> {
    let gauge =
        Gauge::new(name, help).map_err(|e| PublisherError::Metrics(format!("{name}: {e}")))?;
    gauge.set(value);
    registry
        .register(Box::new(gauge))
        .map_err(|e| PublisherError::Metrics(format!("{name}: {e}")))
}
