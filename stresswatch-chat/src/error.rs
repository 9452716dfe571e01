//! Internal helpers for mapping HTTP/reqwest errors to [`ChatError`].

use std::time::Duration;

use stresswatch_types::ChatError;

/// Map a non-success HTTP status from the dashboard backend to a [`ChatError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ChatError {
    match status.as_u16() {
        401 | 403 => ChatError::Authentication(body.to_string()),
        400 | 404 | 422 => ChatError::InvalidRequest(body.to_string()),
        // The backend does not send a retry delay in the body; callers with
        // header access can construct `RateLimit` directly.
        429 => ChatError::RateLimit { retry_after: None },
        500..=599 => ChatError::ServiceUnavailable(body.to_string()),
        _ => ChatError::Http {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

/// Map a [`reqwest::Error`] to a [`ChatError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        // Generic 30-second duration; the configured timeout is not visible here.
        ChatError::Timeout(Duration::from_secs(30))
    } else {
        ChatError::Network(Box::new(err))
    }
}
