//! Resilience collaborators for the publisher
//!
//! Each piece is owned by [`EventPublisher`](crate::EventPublisher) and can
//! be used and tested on its own:
//! - **RetryExecutor**: bounded attempts with exponential backoff
//! - **CircuitBreaker**: fail fast while the broker keeps failing
//! - **DeadLetterRouter**: best-effort quarantine of undeliverable events
//!
//! # Example
//!
//! ```ignore
//! use herald_publisher::resilience::*;
//!
//! let metrics = Arc::new(MetricsRecorder::new());
//! let retry = RetryExecutor::new(RetryPolicy::default(), metrics.clone());
//! let breaker = CircuitBreaker::with_defaults(metrics.clone());
//!
//! breaker.check()?;
//! match retry.execute(|_| broker.produce("orders", None, bytes.clone())).await {
//!     Ok(_) => breaker.record_success(),
//!     Err(_) => breaker.record_failure(),
//! }
//! ```

mod circuit_breaker;
mod dlq;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use dlq::{DeadLetterConfig, DeadLetterRecord, DeadLetterRouter};
pub use retry::{Retried, RetryExecutor, RetryPolicy};
