//! GraphQL transport layer.
//!
//! Performs exactly one request/response exchange per call and classifies the
//! outcome as transient (worth retrying) or fatal (propagate immediately).
//! Retry policy and pacing live in [`crate::scheduler`], not here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ExporterConfig, HTTP_CONNECT_TIMEOUT_SECS};

/// Classified outcome of a failed exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network error, timeout, throttling, server error, or an unclassified
    /// remote error - the caller may retry.
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// Authentication rejected or the query itself is malformed - retrying
    /// can never succeed.
    #[error("fatal transport failure: {0}")]
    Fatal(String),
}

impl TransportError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// Result type for transport operations
pub type TransportResult = Result<Value, TransportError>;

/// One GraphQL exchange: query plus variables in, the `data` payload out.
///
/// The trait seam exists so the scheduler, catalog walker and split fetcher
/// can be driven by scripted in-memory transports in tests.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Execute one exchange. Implementations perform no retries.
    async fn execute(&self, query: &str, variables: Value) -> TransportResult;
}

/// Shape of a GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorExtensions {
    code: Option<String>,
}

/// HTTP transport against the Printavo GraphQL API v2.
///
/// Authenticates with the `email` and `token` headers Printavo expects on
/// every request. Both timeouts are bounded because the remote is known to
/// hang on occasion; a timed-out call surfaces as a transient failure.
pub struct HttpGraphTransport {
    client: Client,
    endpoint: String,
    email: String,
    token: String,
}

impl HttpGraphTransport {
    /// Build a transport from the exporter configuration.
    pub fn new(config: &ExporterConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
            email: config.email.clone(),
            token: config.token.clone(),
        })
    }

    /// Classify a GraphQL-level error reported in the response envelope.
    ///
    /// Printavo reports authentication and query-validation problems through
    /// the `errors` array with a 200 status. Anything not clearly one of
    /// those (complexity rejections, throttling, internal errors) is treated
    /// as transient.
    fn classify_graphql_error(error: &GraphqlError) -> TransportError {
        let message = error.message.to_lowercase();
        let code = error
            .extensions
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .unwrap_or("");

        let fatal_auth = message.contains("not authorized")
            || message.contains("unauthorized")
            || message.contains("authentication")
            || message.contains("invalid token");
        let fatal_validation = code == "GRAPHQL_VALIDATION_FAILED"
            || code == "GRAPHQL_PARSE_FAILED"
            || message.contains("parse error");

        if fatal_auth || fatal_validation {
            TransportError::Fatal(error.message.clone())
        } else {
            TransportError::Transient(error.message.clone())
        }
    }

    /// Classify a non-success HTTP status.
    fn classify_status(status: StatusCode, body: &str) -> TransportError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Fatal(format!(
                "authentication rejected ({status}): {body}"
            )),
            StatusCode::BAD_REQUEST => {
                TransportError::Fatal(format!("malformed request ({status}): {body}"))
            }
            // 429, 5xx and anything else unexpected: worth retrying
            _ => TransportError::Transient(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl GraphTransport for HttpGraphTransport {
    async fn execute(&self, query: &str, variables: Value) -> TransportResult {
        let body = json!({ "query": query, "variables": variables });

        debug!(endpoint = %self.endpoint, "Executing GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("email", &self.email)
            .header("token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Transient(format!("request timed out: {e}"))
                } else {
                    TransportError::Transient(format!("network error: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = Self::classify_status(status, &text);
            warn!(status = %status, transient = err.is_transient(), "Non-success response");
            return Err(err);
        }

        let envelope: GraphqlResponse = response.json().await.map_err(|e| {
            TransportError::Transient(format!("failed to deserialize response: {e}"))
        })?;

        if let Some(errors) = envelope.errors {
            if let Some(first) = errors.first() {
                let err = Self::classify_graphql_error(first);
                warn!(
                    error_count = errors.len(),
                    transient = err.is_transient(),
                    message = %first.message,
                    "GraphQL error response"
                );
                return Err(err);
            }
        }

        envelope
            .data
            .ok_or_else(|| TransportError::Transient("response carried no data".to_string()))
    }
}
