//! Exporter configuration and tuning constants.
//!
//! The defaults are sized for Printavo's published ceilings: roughly 10
//! requests per 5 seconds per token, and a ~25k complexity budget per query.

use std::path::PathBuf;
use std::time::Duration;

/// Default Printavo GraphQL API v2 endpoint.
pub const DEFAULT_API_URL: &str = "https://www.printavo.com/api/v2";

/// Maximum number of attempts per request (first try included).
/// 5 attempts with growing backoff rides out throttling bursts and brief
/// outages without hammering an API that bans abusive tokens.
pub const MAX_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts in milliseconds.
/// 2 seconds gives the remote's rate window room to reset before retrying.
pub const RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Maximum retry delay in milliseconds.
/// 30 seconds caps exponential growth so a flaky order never stalls a phase
/// for minutes per attempt.
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Minimum delay between any two requests, in milliseconds, enforced
/// process-wide. 600ms keeps the aggregate rate safely under 10 requests
/// per 5 seconds even with the per-order sub-queries in flight concurrently.
pub const MIN_REQUEST_DELAY_MS: u64 = 600;

/// Listing page size. Printavo caps connection pages at 25 nodes.
pub const LISTING_PAGE_SIZE: u32 = 25;

/// Save the checkpoint after this many completed orders.
/// Low enough that an unclean restart re-examines only a handful of orders
/// (each a free existence check), high enough to bound checkpoint I/O.
pub const CHECKPOINT_INTERVAL_ORDERS: u64 = 10;

/// HTTP connect timeout (seconds) - time to establish the TCP connection.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds) - the remote occasionally hangs on heavy
/// queries; past this the attempt counts as a transient failure.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Calculate the delay before retry attempt `attempt` (1-indexed).
///
/// Exponential in the base delay: base, 2x base, 4x base, ... capped at
/// [`MAX_RETRY_DELAY_MS`].
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    let delay = base.saturating_mul(factor);
    delay.min(Duration::from_millis(MAX_RETRY_DELAY_MS))
}

/// Runtime configuration for one export run.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// GraphQL endpoint URL
    pub api_url: String,
    /// Account email, sent as the `email` header
    pub email: String,
    /// API token, sent as the `token` header
    pub token: String,
    /// Root directory for records, checkpoint, ledger and summary
    pub output_dir: PathBuf,
    /// Global minimum delay between requests
    pub min_request_delay: Duration,
    /// Maximum attempts per request
    pub max_attempts: u32,
    /// Base retry backoff delay
    pub retry_base_delay: Duration,
    /// Listing page size
    pub page_size: u32,
    /// Completed orders between checkpoint flushes
    pub checkpoint_interval: u64,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ExporterConfig {
    /// Create a configuration with library defaults for everything except
    /// credentials and output location.
    pub fn new(email: String, token: String, output_dir: PathBuf) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            email,
            token,
            output_dir,
            min_request_delay: Duration::from_millis(MIN_REQUEST_DELAY_MS),
            max_attempts: MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            page_size: LISTING_PAGE_SIZE,
            checkpoint_interval: CHECKPOINT_INTERVAL_ORDERS,
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Validate credentials and tuning values.
    ///
    /// Placeholder credentials left over from a template `.env` would burn
    /// the whole run on authentication failures, so they are rejected here
    /// before any request is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(ConfigError::InvalidCredential(
                "email must be a non-empty address".to_string(),
            ));
        }
        if is_placeholder(&self.email) {
            return Err(ConfigError::PlaceholderCredential("email".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::InvalidCredential(
                "token must not be empty".to_string(),
            ));
        }
        if is_placeholder(&self.token) {
            return Err(ConfigError::PlaceholderCredential("token".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "api_url must not be empty".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidValue(
                "checkpoint_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values commonly shipped in sample configs that must never reach the API.
fn is_placeholder(value: &str) -> bool {
    const PLACEHOLDERS: &[&str] = &[
        "you@example.com",
        "user@example.com",
        "changeme",
        "change-me",
        "your-token",
        "your_token_here",
        "xxx",
        "todo",
    ];
    let lowered = value.trim().to_lowercase();
    PLACEHOLDERS.contains(&lowered.as_str())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Credential missing or malformed
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Credential still set to a sample/placeholder value
    #[error("placeholder credential: {0} is still set to a sample value")]
    PlaceholderCredential(String),

    /// Tuning value out of range
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}
