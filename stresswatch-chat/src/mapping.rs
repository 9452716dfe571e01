//! Frame payload interpretation.
//!
//! The upstream service speaks two dialects: the generic backend shape
//! (`{"chunk"|"delta"|"content": "...", "conversation_id": "..."}`) and a
//! Dify-style event schema (`{"event":"message","answer":"..."}` /
//! `{"event":"message_end","conversation_id":"..."}`). Rather than two code
//! paths, both collapse into one field-priority table here; a new dialect is
//! added by extending the table.

use stresswatch_types::{ChatError, StreamEvent};

/// Interpret one frame payload as JSON and normalize it to events.
///
/// A frame may carry both content and a conversation id; events are returned
/// in delivery order (content first). Valid JSON with no recognized field
/// maps to [`StreamEvent::Unrecognized`]. A parse failure is returned to the
/// caller to count — one bad frame must never abort the stream.
pub(crate) fn map_frame(payload: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
    let json: serde_json::Value = serde_json::from_str(payload)?;
    let event_kind = json["event"].as_str().unwrap_or_default();

    let mut events = Vec::new();

    // Content, in field-priority order; the nested `answer` shape only
    // counts when discriminated by `event == "message"`.
    let content = json["chunk"]
        .as_str()
        .or_else(|| json["delta"].as_str())
        .or_else(|| json["content"].as_str())
        .or_else(|| (event_kind == "message").then(|| json["answer"].as_str()).flatten());
    if let Some(text) = content {
        events.push(StreamEvent::ContentDelta(text.to_string()));
    }

    if let Some(id) = json["conversation_id"].as_str()
        && !id.is_empty()
    {
        events.push(StreamEvent::SessionId(id.to_string()));
    }

    if event_kind == "message_end" {
        events.push(StreamEvent::Terminal);
    }

    if events.is_empty() {
        events.push(StreamEvent::Unrecognized);
    }
    Ok(events)
}

/// Resolve the assistant text from a non-streaming `/chat` response body.
///
/// First present of `response`, `answer`, `message`, in that order.
pub(crate) fn completion_text(body: &str) -> Result<String, ChatError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ChatError::InvalidRequest(format!("invalid JSON response: {e}")))?;

    ["response", "answer", "message"]
        .iter()
        .find_map(|key| json[*key].as_str())
        .map(str::to_string)
        .ok_or_else(|| ChatError::InvalidRequest("no assistant text in response".into()))
}
