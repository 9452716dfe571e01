//! Dashboard backend client struct and builder.

use std::time::Duration;

use futures::StreamExt;
use stresswatch_types::{ChatError, ChatRequest, Prediction};

use crate::error::{map_http_status, map_reqwest_error};
use crate::transport::{ChatTransport, ChunkStream};

/// Default backend base URL (the dashboard's local dev server).
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default timeout for non-streaming requests.
///
/// Not applied to streaming turns — a reply can legitimately take longer
/// than any single-request budget while tokens keep arriving.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the stresswatch dashboard backend.
///
/// Implements [`ChatTransport`] for use anywhere a transport is accepted.
///
/// # Example
///
/// ```no_run
/// use stresswatch_chat::BackendClient;
///
/// let client = BackendClient::new()
///     .base_url("https://stresswatch.example.org/api");
/// ```
pub struct BackendClient {
    /// Backend base URL (override for deployments or tests).
    pub(crate) base_url: String,
    /// Timeout applied to non-streaming requests.
    pub(crate) timeout: Duration,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl BackendClient {
    /// Create a client with sensible defaults.
    ///
    /// Default base URL: `http://localhost:8000`. Default timeout for
    /// non-streaming requests: 30 seconds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Override the backend base URL.
    ///
    /// Useful for testing with a local mock server or a deployed backend.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the non-streaming request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the blocking chat endpoint URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    /// Build the streaming chat endpoint URL.
    pub(crate) fn chat_stream_url(&self) -> String {
        format!("{}/chat/stream", self.base_url)
    }

    /// Build the prediction endpoint URL.
    pub(crate) fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    /// Fetch the stress forecast for a patient.
    pub async fn fetch_prediction(&self, patient_id: &str) -> Result<Prediction, ChatError> {
        let url = self.predict_url();
        tracing::debug!(url = %url, patient_id = %patient_id, "requesting prediction");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("content-type", "application/json")
            .json(&serde_json::json!({ "patient_id": patient_id }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(map_http_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ChatError::InvalidRequest(format!("invalid prediction response: {e}")))
    }
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTransport for BackendClient {
    /// Open a streaming chat turn against `/chat/stream`.
    ///
    /// The future resolves once the response status has been accepted; the
    /// returned [`ChunkStream`] delivers the body as the server produces it.
    /// No read timeout is applied to the stream itself.
    fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChunkStream, ChatError>> + Send {
        let url = self.chat_stream_url();
        let http_client = self.client.clone();

        async move {
            tracing::debug!(url = %url, "opening streaming chat turn");

            let response = http_client
                .post(&url)
                .header("content-type", "application/json")
                .json(request)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.map_err(map_reqwest_error)?;
                return Err(map_http_status(status, &body));
            }

            let chunks = response
                .bytes_stream()
                .map(|result| result.map_err(map_reqwest_error));
            Ok(Box::pin(chunks) as ChunkStream)
        }
    }

    /// Issue a blocking chat request against `/chat` and return the body.
    fn fetch(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, ChatError>> + Send {
        let url = self.chat_url();
        let http_client = self.client.clone();
        let timeout = self.timeout;

        async move {
            tracing::debug!(url = %url, "sending blocking chat request");

            let response = http_client
                .post(&url)
                .timeout(timeout)
                .header("content-type", "application/json")
                .json(request)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            let body = response.text().await.map_err(map_reqwest_error)?;
            if !status.is_success() {
                return Err(map_http_status(status, &body));
            }

            Ok(body)
        }
    }
}

// Required to satisfy the `impl Future` in the trait impl bodies
use std::future::Future;
