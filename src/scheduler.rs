//! Request scheduling: global pacing and bounded retry.
//!
//! Every request the exporter makes, from any call site, passes through one
//! shared [`PacingGate`] so the aggregate call rate never exceeds the remote's
//! ceiling. Exceeding it risks the token being banned, which would abort the
//! entire run - this is the single most important politeness invariant in the
//! crate.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::retry_delay;
use crate::metrics;
use crate::transport::{GraphTransport, TransportError, TransportResult};

/// Process-wide minimum-delay gate.
///
/// The last-call instant sits behind an async mutex and the sleep happens
/// while the lock is held, so concurrent callers serialize: no matter how
/// many sub-queries are in flight, consecutive requests are always at least
/// `min_delay` apart.
pub struct PacingGate {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl PacingGate {
    /// Create a gate enforcing `min_delay` between consecutive requests.
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until this caller may issue the next request.
    pub async fn wait_turn(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.min_delay {
                sleep(self.min_delay - since).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// The configured minimum inter-request delay.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

/// Retrying executor on top of a [`GraphTransport`].
///
/// Transient failures are retried up to `max_attempts` total attempts with
/// backoff growing per attempt; fatal failures and attempt exhaustion
/// propagate to the caller. Clone-cheap: callers share the transport and
/// gate through [`Arc`].
#[derive(Clone)]
pub struct Scheduler {
    transport: Arc<dyn GraphTransport>,
    gate: Arc<PacingGate>,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl Scheduler {
    /// Create a scheduler over a shared transport and pacing gate.
    pub fn new(
        transport: Arc<dyn GraphTransport>,
        gate: Arc<PacingGate>,
        max_attempts: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            transport,
            gate,
            max_attempts,
            retry_base_delay,
        }
    }

    /// Execute a query with pacing and retry.
    ///
    /// Each attempt - including retries - takes its turn at the gate, so
    /// retry storms cannot break the rate ceiling either.
    pub async fn execute(&self, query: &str, variables: Value) -> TransportResult {
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=self.max_attempts {
            self.gate.wait_turn().await;
            metrics::record_request();

            match self.transport.execute(query, variables.clone()).await {
                Ok(data) => {
                    debug!(attempt, "Request succeeded");
                    return Ok(data);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = retry_delay(self.retry_base_delay, attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying after backoff"
                    );
                    metrics::record_retry(backoff, attempt);
                    sleep(backoff).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "Attempts exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }

        // Unreachable with max_attempts >= 1; kept for completeness.
        Err(last_error
            .unwrap_or_else(|| TransportError::Transient("all attempts exhausted".to_string())))
    }

    /// Number of attempts per request, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
