//! Error types shared by the stresswatch chat crates.

use std::time::Duration;

/// Errors from chat transport operations.
///
/// Only failures that abort a whole turn live here. A single malformed frame
/// inside an otherwise healthy stream is recovered locally by the decoder and
/// surfaces as a [`TurnOutcome::CompletedWithWarnings`](crate::TurnOutcome)
/// count, never as a `ChatError`.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    // Retryable errors
    /// Network-level error (connection refused, reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Request timed out before the response completed.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Rate limited by the backend.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the backend.
        retry_after: Option<Duration>,
    },
    /// Backend is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed request, or a response body the client cannot interpret.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The response body text, for diagnostics.
        body: String,
    },
}

impl ChatError {
    /// Whether this error is likely transient and the turn can be retried.
    ///
    /// The decoder itself never retries — retry policy belongs to the caller,
    /// which alone knows whether a retried turn should resume or restart.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } | Self::ServiceUnavailable(_)
        )
    }
}
