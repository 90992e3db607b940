//! herald-publish - publish JSON lines from stdin
//!
//! Each non-empty stdin line is parsed as JSON and published as one event.
//! Messages go to a [`StdoutBroker`], so this is mostly useful to see what
//! envelopes look like after sanitization.
//!
//! ## Usage
//!
//! ```bash
//! echo '{"score": 0.92, "api_key": "hunter2"}' | herald-publish intelligence.quality_assessed.v1
//!
//! # JSON logs on stderr
//! HERALD_LOG_FORMAT=json RUST_LOG=debug herald-publish orders.created < orders.jsonl
//! ```
//!
//! Configuration is read from `HERALD_*` variables (see [`PublisherConfig::from_env`]).
//! Logs go to stderr; envelopes, the metrics snapshot and the Prometheus
//! exposition go to stdout.

use herald_publisher::{
    EventPublisher, PatternSanitizer, PublishRequest, PublisherConfig, StdoutBroker,
    metadata_keys,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_EVENT_TYPE: &str = "herald.cli.event.v1";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let event_type = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());

    let config = PublisherConfig::from_env()?;
    info!(
        event_type = %event_type,
        service = %config.service_name,
        max_attempts = config.max_attempts,
        enable_dlq = config.enable_dlq,
        enable_sanitization = config.enable_sanitization,
        "Starting herald-publish"
    );

    let broker = Arc::new(StdoutBroker::new());
    let publisher = EventPublisher::builder(broker)
        .config(config)
        .sanitizer(Arc::new(PatternSanitizer::new()))
        .default_metadata(metadata_keys::OPERATION_TYPE, "cli_publish")
        .build()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown_signal() => {
                info!("interrupted, stopping input");
                None
            }
        };
        let Some(line) = line else { break };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let payload: serde_json::Value = match serde_json::from_str(line) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "skipping line that is not valid JSON");
                continue;
            }
        };

        if let Err(open) = publisher
            .publish(PublishRequest::new(event_type.as_str(), payload))
            .await
        {
            tracing::warn!(
                retry_after_ms = open.retry_after.as_millis() as u64,
                "circuit open, event not published"
            );
        }
    }

    publisher.close().await;

    let snapshot = publisher.metrics();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    print!("{}", publisher.encode_prometheus()?);

    info!(
        published = snapshot.published,
        failed = snapshot.failed,
        "herald-publish finished"
    );
    Ok(())
}

fn init_tracing() {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("HERALD_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
