//! Error types for HERALD

use std::time::Duration;
use thiserror::Error;

// Re-export ProduceError from herald-core
pub use herald_core::ProduceError;

/// Result type alias for HERALD setup operations
pub type Result<T> = std::result::Result<T, PublisherError>;

/// Error for setup and introspection paths (config loading, metric export)
///
/// Publish outcomes never use this type: a publish either returns a bool or
/// a [`CircuitOpenError`].
#[derive(Error, Debug)]
pub enum PublisherError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics error
    #[error("metrics error: {0}")]
    Metrics(String),
}

/// The circuit breaker is open; no broker I/O was attempted
///
/// The only error a publish call surfaces to its caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("circuit breaker open after {consecutive_failures} consecutive failures, retry in {retry_after:?}")]
pub struct CircuitOpenError {
    /// Failures recorded when the request was rejected
    pub consecutive_failures: u32,
    /// Time left until the breaker lets a probe through
    pub retry_after: Duration,
}

/// The envelope could not be rendered to the wire format
///
/// Fatal for the event: it is not retried and not sent to the dead-letter
/// topic, since there is nothing valid to send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("serialization error: {0}")]
pub struct SerializationError(pub String);

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError(err.to_string())
    }
}

/// All attempts of a retried operation failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    /// Attempts made, including the first one
    pub attempts: u32,
    /// Error returned by the final attempt
    pub last_error: E,
}

/// Routing a failed event to its dead-letter topic failed
///
/// Logged by the publisher, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeadLetterError {
    /// The dead-letter record could not be rendered
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The broker refused the dead-letter record
    #[error("dead-letter produce failed: {0}")]
    Produce(#[from] ProduceError),

    /// The broker did not confirm within the routing timeout
    #[error("dead-letter produce timed out after {0:?}")]
    Timeout(Duration),
}
