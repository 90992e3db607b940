//! Stdout broker for debugging
//!
//! Prints produced messages to stdout instead of sending them anywhere.
//! Useful for development and for the `herald-publish` binary.

use crate::broker::{BrokerClient, DeliveryReport, ProduceError};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Stdout broker - prints messages for debugging
pub struct StdoutBroker {
    /// Pretty print messages in a box
    pretty: bool,
    /// Count of messages written
    produced_count: AtomicU64,
}

impl StdoutBroker {
    /// Create a new StdoutBroker printing one line per message
    pub fn new() -> Self {
        Self {
            pretty: false,
            produced_count: AtomicU64::new(0),
        }
    }

    /// Create a new StdoutBroker with pretty printing
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            produced_count: AtomicU64::new(0),
        }
    }

    /// Get total messages written
    pub fn produced_count(&self) -> u64 {
        self.produced_count.load(Ordering::Relaxed)
    }
}

impl Default for StdoutBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for StdoutBroker {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        value: Bytes,
    ) -> Result<DeliveryReport, ProduceError> {
        let mut stdout = std::io::stdout().lock();
        let key = key.map(String::from_utf8_lossy);
        let body = String::from_utf8_lossy(&value);

        let result = if self.pretty {
            writeln!(stdout, "┌─ Message ─────────────────────────────")
                .and_then(|_| writeln!(stdout, "│ Topic:   {topic}"))
                .and_then(|_| match &key {
                    Some(key) => writeln!(stdout, "│ Key:     {key}"),
                    None => Ok(()),
                })
                .and_then(|_| writeln!(stdout, "│ Size:    {} bytes", value.len()))
                .and_then(|_| writeln!(stdout, "│ Value:   {body}"))
                .and_then(|_| writeln!(stdout, "└───────────────────────────────────────"))
        } else {
            writeln!(
                stdout,
                "[{topic}] {} ({} bytes) {body}",
                key.as_deref().unwrap_or("-"),
                value.len()
            )
        };

        result.map_err(|e| ProduceError::Send(format!("stdout write failed: {e}")))?;
        let offset = self.produced_count.fetch_add(1, Ordering::Relaxed);
        Ok(DeliveryReport::new(topic).at(0, offset as i64))
    }

    async fn flush(&self, _timeout: Duration) -> usize {
        // Lines are written synchronously, nothing is ever left pending.
        if let Err(e) = std::io::stdout().flush() {
            tracing::warn!(error = %e, "stdout flush failed");
        }
        0
    }
}
