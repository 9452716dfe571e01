//! Request and response body types for the dashboard backend.

use serde::{Deserialize, Serialize};

/// Body of a `/chat` or `/chat/stream` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation id from a prior turn, when continuing a dialogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Create a request for a fresh conversation.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
        }
    }

    /// Attach the conversation id of an ongoing dialogue.
    #[must_use]
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// A stress forecast returned by the backend's `/predict` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Short headline, e.g. "Forecast result".
    pub title: String,
    /// Human-readable forecast detail for the clinician.
    pub detail: String,
}
