//! Turn driver: pulls chunks from a transport, decodes frames, and delivers
//! content increments to the consumer in strict arrival order.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use stresswatch_types::{ChatError, ChatRequest, StreamEvent, TurnOutcome};

use crate::accumulator::{Frame, FrameAccumulator};
use crate::mapping;
use crate::transport::ChatTransport;

/// A multi-turn chat dialogue with the dashboard backend.
///
/// Owns the server-assigned conversation id across turns: the id arriving in
/// one turn's stream is attached to the next turn's request automatically.
/// Each turn owns a fresh [`FrameAccumulator`]; only the conversation id
/// outlives the stream. `&mut self` on the turn methods means one in-flight
/// turn per session — run concurrent turns on separate sessions.
#[derive(Debug, Default)]
pub struct ChatSession {
    /// Conversation id from the most recent turn, if any.
    session_id: Option<String>,
}

impl ChatSession {
    /// Start a session with no conversation history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation id to correlate the next turn with, if the server
    /// has assigned one.
    #[must_use]
    pub fn current_session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Build the outbound request for the next turn.
    fn next_request(&self, message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            conversation_id: self.session_id.clone(),
        }
    }

    /// Run one streaming turn end-to-end.
    ///
    /// `on_delta` is invoked synchronously for every content increment, in
    /// the exact order frames appeared on the wire — the decode loop is
    /// strictly sequential and the chunk pull is its only await point.
    ///
    /// Frame-level failures never abort the turn: a frame that does not
    /// parse as JSON is skipped, logged, and counted into
    /// [`TurnOutcome::CompletedWithWarnings`]. Cancelling `cancel` stops the
    /// turn at the next chunk pull with no further callbacks; content
    /// already delivered is the caller's to keep or discard.
    pub async fn stream<T, F>(
        &mut self,
        transport: &T,
        message: &str,
        mut on_delta: F,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError>
    where
        T: ChatTransport,
        F: FnMut(&str),
    {
        let request = self.next_request(message);
        let mut chunks = transport.open_stream(&request).await?;

        let mut accumulator = FrameAccumulator::new();
        let mut warnings = 0usize;
        let mut aborted = false;

        loop {
            let Some(pulled) = cancel.run_until_cancelled(chunks.next()).await else {
                return Ok(TurnOutcome::Cancelled);
            };
            let chunk = match pulled {
                None => break,
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    // The connection died mid-stream. Content already
                    // delivered stands; finish the turn as truncated.
                    tracing::warn!(error = %err, "stream read error, finishing turn early");
                    aborted = true;
                    break;
                }
            };
            for frame in accumulator.feed(&chunk) {
                self.apply_frame(frame, &mut on_delta, &mut warnings);
            }
        }

        let flush = accumulator.flush();
        for frame in flush.frames {
            self.apply_frame(frame, &mut on_delta, &mut warnings);
        }

        if aborted || flush.truncated {
            Ok(TurnOutcome::TruncatedStream)
        } else if warnings > 0 {
            Ok(TurnOutcome::CompletedWithWarnings { count: warnings })
        } else {
            Ok(TurnOutcome::Completed)
        }
    }

    /// Run one non-streaming turn and return the resolved assistant text.
    ///
    /// The frame decoder is not involved; the whole response body is parsed
    /// as one JSON object.
    pub async fn complete<T: ChatTransport>(
        &mut self,
        transport: &T,
        message: &str,
    ) -> Result<String, ChatError> {
        let request = self.next_request(message);
        let body = transport.fetch(&request).await?;
        mapping::completion_text(&body)
    }

    /// Interpret one frame and dispatch its events.
    fn apply_frame<F: FnMut(&str)>(&mut self, frame: Frame, on_delta: &mut F, warnings: &mut usize) {
        let payload = match frame {
            // Normal termination sentinel; nothing to deliver.
            Frame::Done => return,
            Frame::Payload(payload) => payload,
        };
        match mapping::map_frame(&payload) {
            Err(err) => {
                *warnings += 1;
                tracing::warn!(error = %err, payload = %payload, "malformed frame skipped");
            }
            Ok(events) => {
                for event in events {
                    match event {
                        StreamEvent::ContentDelta(text) => on_delta(&text),
                        // Last id seen in a turn wins; it becomes the
                        // correlation token for the next request.
                        StreamEvent::SessionId(id) => self.session_id = Some(id),
                        StreamEvent::Terminal | StreamEvent::Unrecognized => {}
                    }
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
