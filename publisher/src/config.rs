//! Configuration for HERALD

use crate::error::{PublisherError, Result};
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};
use herald_core::EventSource;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Publisher configuration
///
/// Deserializable (missing fields take their defaults) and loadable from
/// `HERALD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Total produce attempts per event, including the first one
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles after each further failure
    pub base_backoff_ms: u64,

    /// Upper bound for a single backoff delay
    pub max_backoff_ms: u64,

    /// Consecutive failures that open the circuit breaker
    pub circuit_breaker_threshold: u32,

    /// Seconds the breaker stays open before letting a probe through
    pub circuit_breaker_cooldown_s: u64,

    /// Route exhausted events to `<topic><dlq_suffix>`
    pub enable_dlq: bool,

    /// Run the sanitizer over every rendered envelope
    pub enable_sanitization: bool,

    /// Suffix appended to the original topic for dead-letter records
    pub dlq_suffix: String,

    /// Bound on the single dead-letter produce
    pub dlq_timeout_ms: u64,

    /// Bound on the flush performed by `close`
    pub close_timeout_ms: u64,

    /// Service name stamped on every envelope
    pub service_name: String,

    /// Instance id stamped on every envelope
    pub instance_id: String,

    /// Hostname stamped on every envelope, when known
    pub hostname: Option<String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 1000,
            max_backoff_ms: 60_000,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_s: 60,
            enable_dlq: true,
            enable_sanitization: true,
            dlq_suffix: ".dlq".to_string(),
            dlq_timeout_ms: 5000,
            close_timeout_ms: 10_000,
            service_name: "herald".to_string(),
            instance_id: "default".to_string(),
            hostname: None,
        }
    }
}

impl PublisherConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = PublisherConfig::default();

        if let Some(v) = parse_var("HERALD_MAX_ATTEMPTS")? {
            config.max_attempts = v;
        }
        if let Some(v) = parse_var("HERALD_BASE_BACKOFF_MS")? {
            config.base_backoff_ms = v;
        }
        if let Some(v) = parse_var("HERALD_MAX_BACKOFF_MS")? {
            config.max_backoff_ms = v;
        }
        if let Some(v) = parse_var("HERALD_CIRCUIT_BREAKER_THRESHOLD")? {
            config.circuit_breaker_threshold = v;
        }
        if let Some(v) = parse_var("HERALD_CIRCUIT_BREAKER_COOLDOWN_S")? {
            config.circuit_breaker_cooldown_s = v;
        }
        if let Some(v) = parse_bool_var("HERALD_ENABLE_DLQ")? {
            config.enable_dlq = v;
        }
        if let Some(v) = parse_bool_var("HERALD_ENABLE_SANITIZATION")? {
            config.enable_sanitization = v;
        }
        if let Ok(v) = env::var("HERALD_DLQ_SUFFIX") {
            config.dlq_suffix = v;
        }
        if let Some(v) = parse_var("HERALD_DLQ_TIMEOUT_MS")? {
            config.dlq_timeout_ms = v;
        }
        if let Some(v) = parse_var("HERALD_CLOSE_TIMEOUT_MS")? {
            config.close_timeout_ms = v;
        }
        if let Ok(v) = env::var("HERALD_SERVICE_NAME") {
            config.service_name = v;
        }
        if let Ok(v) = env::var("HERALD_INSTANCE_ID") {
            config.instance_id = v;
        }
        if let Ok(v) = env::var("HOSTNAME") {
            config.hostname = Some(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(PublisherError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(PublisherError::Config(
                "circuit_breaker_threshold must be at least 1".into(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(PublisherError::Config("service_name must not be empty".into()));
        }
        if self.dlq_suffix.is_empty() {
            return Err(PublisherError::Config("dlq_suffix must not be empty".into()));
        }
        Ok(())
    }

    /// Retry policy derived from this config
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    /// Circuit breaker settings derived from this config
    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            cooldown: Duration::from_secs(self.circuit_breaker_cooldown_s),
        }
    }

    /// Identity stamped on envelopes and dead-letter records
    pub fn source(&self) -> EventSource {
        let source = EventSource::new(&self.service_name, &self.instance_id);
        match &self.hostname {
            Some(hostname) => source.with_hostname(hostname),
            None => source,
        }
    }

    /// Dead-letter routing timeout
    pub fn dlq_timeout(&self) -> Duration {
        Duration::from_millis(self.dlq_timeout_ms)
    }

    /// Flush timeout used by `close`
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PublisherError::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool_var(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| PublisherError::Config(format!("invalid {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PublisherConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_backoff_ms, 1000);
        assert_eq!(config.circuit_breaker_threshold, 5);
        assert_eq!(config.circuit_breaker_cooldown_s, 60);
        assert!(config.enable_dlq);
        assert!(config.enable_sanitization);
        assert_eq!(config.dlq_timeout(), Duration::from_secs(5));
        assert_eq!(config.close_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: PublisherConfig = serde_json::from_str(
            r#"{"max_attempts": 3, "enable_dlq": false, "service_name": "intelligence"}"#,
        )
        .unwrap();

        assert_eq!(config.max_attempts, 3);
        assert!(!config.enable_dlq);
        assert_eq!(config.service_name, "intelligence");
        assert_eq!(config.base_backoff_ms, 1000);
        assert_eq!(config.dlq_suffix, ".dlq");
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = PublisherConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PublisherError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = PublisherConfig {
            circuit_breaker_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PublisherError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_service() {
        let config = PublisherConfig {
            service_name: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PublisherError::Config(_))));
    }

    #[test]
    fn test_derived_policies() {
        let config = PublisherConfig {
            max_attempts: 3,
            base_backoff_ms: 100,
            circuit_breaker_threshold: 2,
            circuit_breaker_cooldown_s: 1,
            ..Default::default()
        };

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_backoff, Duration::from_millis(100));

        let cb = config.circuit_breaker();
        assert_eq!(cb.failure_threshold, 2);
        assert_eq!(cb.cooldown, Duration::from_secs(1));
    }

    #[test]
    fn test_source_includes_hostname() {
        let config = PublisherConfig {
            service_name: "intelligence".into(),
            instance_id: "i-1".into(),
            hostname: Some("host-a".into()),
            ..Default::default()
        };
        let source = config.source();
        assert_eq!(source.service, "intelligence");
        assert_eq!(source.hostname.as_deref(), Some("host-a"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
