//! Circuit breaker
//!
//! Two-state breaker with time-gated probing: once open, it rejects requests
//! until the cooldown since the last failure has elapsed, then lets requests
//! through as probes without changing state. Only a successful probe closes
//! it again; a failed probe refreshes the failure time and keeps it open.
//!
//! The probe is not exclusive. Every caller that checks the breaker after
//! the cooldown expired is let through, so concurrent callers may all probe
//! a still-failing broker at once.

use crate::error::CircuitOpenError;
use crate::metrics::MetricsRecorder;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Requests flow through
    Closed,
    /// Requests fail fast until the cooldown elapses
    Open,
}

impl CircuitState {
    /// Convert to Prometheus metric value (0=Closed, 1=Open)
    pub fn as_metric_value(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures to open circuit
    pub failure_threshold: u32,
    /// Time since the last failure before a probe is let through
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Internal state tracking
///
/// `open` implies `consecutive_failures >= failure_threshold`.
struct CircuitBreakerState {
    open: bool,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl CircuitBreakerState {
    fn new() -> Self {
        Self {
            open: false,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Consecutive-failure breaker shared by every publish on one publisher
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
    metrics: Arc<MetricsRecorder>,
}

impl CircuitBreaker {
    /// Create a breaker reporting opens to `metrics`
    pub fn new(config: CircuitBreakerConfig, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitBreakerState::new()),
            metrics,
        }
    }

    /// Create a breaker with default configuration
    pub fn with_defaults(metrics: Arc<MetricsRecorder>) -> Self {
        Self::new(CircuitBreakerConfig::default(), metrics)
    }

    /// Breaker configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get current circuit state (for monitoring)
    pub fn state(&self) -> CircuitState {
        if self.state.lock().open {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// When the most recent failure was recorded
    pub fn last_failure_at(&self) -> Option<Instant> {
        self.state.lock().last_failure_at
    }

    /// Whether a request may proceed right now
    ///
    /// Closed: always. Open: only once more than `cooldown` has passed since
    /// the last failure, and then for every caller until an outcome is
    /// recorded.
    pub fn allow_request(&self) -> bool {
        self.check().is_ok()
    }

    /// Like [`allow_request`](Self::allow_request), with the rejection as an error
    pub fn check(&self) -> Result<(), CircuitOpenError> {
        let state = self.state.lock();
        if !state.open {
            return Ok(());
        }

        let elapsed = state
            .last_failure_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::MAX);
        if elapsed > self.config.cooldown {
            tracing::debug!(
                failures = state.consecutive_failures,
                "circuit breaker cooldown elapsed, letting probe through"
            );
            return Ok(());
        }

        Err(CircuitOpenError {
            consecutive_failures: state.consecutive_failures,
            retry_after: self.config.cooldown.saturating_sub(elapsed),
        })
    }

    /// Record successful request; closes the breaker unconditionally
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        let was_open = state.open;
        state.consecutive_failures = 0;
        state.open = false;
        drop(state);

        if was_open {
            tracing::info!("circuit breaker closed - broker recovered");
        }
    }

    /// Record failed request
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure_at = Some(Instant::now());

        let failures = state.consecutive_failures;
        let opened = !state.open && failures >= self.config.failure_threshold;
        let probe_failed = state.open;
        if opened {
            state.open = true;
        }
        drop(state);

        if opened {
            self.metrics.record_circuit_open();
            tracing::warn!(
                failures = failures,
                cooldown_s = self.config.cooldown.as_secs(),
                "circuit breaker opened - too many failures"
            );
        } else if probe_failed {
            tracing::warn!(failures = failures, "circuit breaker probe failed - staying open");
        }
    }
}
