//! Normalized streaming events and per-turn outcomes.

/// A normalized event produced from one parsed frame payload.
///
/// The backend speaks two dialects (a generic `chunk`/`delta`/`content`
/// shape and a Dify-style `event`/`answer` schema); both normalize to these
/// variants. A single frame may produce more than one event, e.g. a final
/// frame carrying both text and a conversation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An increment of assistant text, in arrival order.
    ContentDelta(String),
    /// A server-assigned conversation id to attach to the next turn.
    SessionId(String),
    /// Explicit end-of-reply marker (`event == "message_end"` or the
    /// `[DONE]` sentinel).
    Terminal,
    /// Valid JSON with no recognized field. Dropped, not an error.
    Unrecognized,
}

/// How one streamed turn ended.
///
/// All variants mean the turn ran to some conclusion; content already
/// delivered to the consumer stands regardless of the variant. Connection
/// failures before any bytes were streamed are a
/// [`ChatError`](crate::ChatError) instead, because no partial content is
/// possible there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream closed cleanly with every frame accounted for.
    Completed,
    /// The stream closed cleanly but one or more frames could not be parsed.
    CompletedWithWarnings {
        /// Number of malformed frames that were skipped.
        count: usize,
    },
    /// The connection closed with unterminated data still buffered.
    TruncatedStream,
    /// The caller cancelled the turn. Not an error.
    Cancelled,
}

impl TurnOutcome {
    /// Whether the stream reached a clean close (possibly with skipped frames).
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithWarnings { .. })
    }
}
