//! Error types for HERALD broker adapters

use std::time::Duration;
use thiserror::Error;

/// Error returned by a [`BrokerClient`](crate::BrokerClient) when a single
/// produce call fails
///
/// The publisher treats every variant as retryable; adapters should pick the
/// variant that best describes the failure for logging, not for control flow.
///
/// # Example
///
/// ```
/// use herald_core::ProduceError;
///
/// fn send() -> Result<(), ProduceError> {
///     Err(ProduceError::Connection("refused".to_string()))
/// }
///
/// match send() {
///     Ok(_) => println!("delivered"),
///     Err(ProduceError::Connection(msg)) => println!("connection failed: {}", msg),
///     Err(e) => println!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProduceError {
    /// Send failed
    ///
    /// The broker accepted the connection but the message was not delivered.
    /// Examples: queue full, leader not available, request too large.
    #[error("send failed: {0}")]
    Send(String),

    /// Connection error
    ///
    /// Examples: DNS lookup failed, connection refused, TLS handshake error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Delivery confirmation did not arrive in time
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The broker explicitly rejected the message
    #[error("message rejected by broker: {0}")]
    Rejected(String),

    /// Not ready
    ///
    /// The client is still starting up or has been closed.
    #[error("broker client not ready")]
    NotReady,
}
