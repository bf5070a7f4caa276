//! Observability metrics for the exporter.
//!
//! Uses the `metrics` crate for low-overhead collection with an optional
//! Prometheus scrape endpoint. Recording is always safe to call; without an
//! installed exporter the macros are no-ops.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize the metrics system with a Prometheus exporter.
///
/// Called once at startup when a scrape address is configured. Idempotent.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "graphql_requests_total",
        Unit::Count,
        "Total number of GraphQL requests issued"
    );

    describe_counter!(
        "graphql_retries_total",
        Unit::Count,
        "Total number of retry attempts after transient failures"
    );

    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );

    describe_counter!(
        "orders_extracted_total",
        Unit::Count,
        "Total number of orders fully extracted and persisted"
    );

    describe_counter!(
        "orders_skipped_total",
        Unit::Count,
        "Total number of orders skipped because a record already existed"
    );

    describe_counter!(
        "orders_failed_total",
        Unit::Count,
        "Total number of orders that exhausted retries"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one outgoing GraphQL request.
pub fn record_request() {
    counter!("graphql_requests_total").increment(1);
}

/// Record one retry with its backoff delay.
pub fn record_retry(backoff: Duration, attempt: u32) {
    counter!(
        "graphql_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(backoff.as_secs_f64());

    debug!(
        attempt = attempt,
        backoff_ms = backoff.as_millis(),
        "Retry backoff recorded"
    );
}

/// Record a fully extracted order.
pub fn record_order_extracted(kind: crate::OrderKind) {
    counter!(
        "orders_extracted_total",
        "kind" => kind.to_string(),
    )
    .increment(1);
}

/// Record an order skipped on resume.
pub fn record_order_skipped(kind: crate::OrderKind) {
    counter!(
        "orders_skipped_total",
        "kind" => kind.to_string(),
    )
    .increment(1);
}

/// Record an order that exhausted retries.
pub fn record_order_failed(kind: crate::OrderKind) {
    counter!(
        "orders_failed_total",
        "kind" => kind.to_string(),
    )
    .increment(1);
}

/// Check if the metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
