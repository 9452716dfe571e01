//! Frame extraction from a chunked chat response body.
//!
//! The backend streams the assistant reply either as Server-Sent Events:
//!
//! ```text
//! data: {"event":"message","answer":"Hel"}
//!
//! data: {"event":"message","answer":"lo"}
//!
//! data: [DONE]
//! ```
//!
//! or as newline-delimited JSON, one object per line. The transport delivers
//! the body in arbitrary byte fragments — a chunk boundary may fall inside a
//! multi-byte character, inside the `data:` marker, or mid JSON token — so
//! everything here is incremental: bytes go in, complete frames come out, and
//! whatever cannot be attributed to a complete frame yet stays buffered for
//! the next feed.

/// The literal sentinel a server sends to mark normal end of stream.
const DONE_SENTINEL: &str = "[DONE]";

/// The SSE field prefix consumed from each block.
const DATA_PREFIX: &str = "data:";

/// One complete, delimiter-terminated unit extracted from the byte stream,
/// prior to JSON parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A frame payload to hand to the JSON interpreter.
    Payload(String),
    /// The `[DONE]` sentinel (case-sensitive, after trimming). Never handed
    /// to JSON parsing.
    Done,
}

/// Wire framing committed to for the remainder of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Not enough data seen to decide yet.
    Undetected,
    /// SSE blocks terminated by a blank line.
    Sse,
    /// One JSON value per newline-terminated line.
    Ndjson,
}

/// Frames recovered by [`FrameAccumulator::flush`] at end of stream.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Final frames salvaged from the remaining buffer.
    pub frames: Vec<Frame>,
    /// Whether the stream closed with unterminated data still buffered.
    pub truncated: bool,
}

/// Turns an unbounded sequence of raw byte chunks into an ordered sequence of
/// complete [`Frame`]s, with zero data loss and zero double delivery.
///
/// Format detection is lazy and sticky: the first buffer containing `data:`
/// commits the stream to SSE framing; otherwise the first buffer containing a
/// newline commits it to NDJSON. Once committed the framing never switches.
/// SSE priority is a deliberate heuristic inherited from the upstream
/// service's two dialects — a stream whose content text happened to embed
/// `data:` before framing was decided would be classified as SSE. Known
/// ambiguity, documented rather than second-guessed.
#[derive(Debug)]
pub struct FrameAccumulator {
    /// Decoded text not yet attributed to a complete frame.
    buf: String,
    /// Trailing bytes of an incomplete multi-byte character, carried to the
    /// next feed.
    partial_utf8: Vec<u8>,
    /// The committed wire framing.
    framing: Framing,
}

impl FrameAccumulator {
    /// Create an accumulator for one stream. Buffer state never outlives the
    /// stream; each turn gets a fresh accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            partial_utf8: Vec::new(),
            framing: Framing::Undetected,
        }
    }

    /// Decode `chunk`, append it to the buffer, and extract every complete
    /// frame now available, in arrival order.
    ///
    /// Never blocks. Anything after the last frame terminator stays buffered
    /// verbatim for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_into_buf(chunk);

        if self.framing == Framing::Undetected {
            if self.buf.contains(DATA_PREFIX) {
                self.framing = Framing::Sse;
            } else if self.buf.contains('\n') {
                self.framing = Framing::Ndjson;
            }
        }

        match self.framing {
            Framing::Undetected => Vec::new(),
            Framing::Sse => self.drain_sse_blocks(),
            Framing::Ndjson => self.drain_ndjson_lines(),
        }
    }

    /// Drain whatever remains once the transport signals end of stream.
    ///
    /// An unterminated trailing `data:` line is still emitted as a final
    /// frame — some servers omit the closing blank line — but any remainder
    /// at close marks the outcome truncated rather than being silently
    /// dropped. A salvaged `[DONE]` sentinel is the one exception: the
    /// server finished its reply and merely skipped the final terminator.
    pub fn flush(&mut self) -> FlushOutcome {
        let mut outcome = FlushOutcome {
            truncated: !self.partial_utf8.is_empty(),
            ..FlushOutcome::default()
        };
        self.partial_utf8.clear();

        let rest = std::mem::take(&mut self.buf);
        if rest.trim().is_empty() {
            return outcome;
        }

        match self.framing {
            Framing::Sse => match sse_block_to_frame(&rest) {
                Some(Frame::Done) => outcome.frames.push(Frame::Done),
                Some(frame) => {
                    outcome.frames.push(frame);
                    outcome.truncated = true;
                }
                None => outcome.truncated = true,
            },
            // NDJSON (or never-detected) leftovers are incomplete by
            // definition: the line terminator was never observed.
            Framing::Ndjson | Framing::Undetected => outcome.truncated = true,
        }

        outcome
    }

    /// Decode a chunk with carried-over multi-byte state and append the text.
    ///
    /// A chunk boundary may split a UTF-8 sequence; the incomplete trailing
    /// bytes are held back and retried when the next chunk arrives. A byte
    /// sequence that is actually invalid (not merely incomplete) decodes to
    /// U+FFFD so one bad byte cannot stall the stream.
    fn decode_into_buf(&mut self, chunk: &[u8]) {
        let mut input = std::mem::take(&mut self.partial_utf8);
        input.extend_from_slice(chunk);

        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buf.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.buf.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        // Incomplete trailing sequence: carry to the next feed.
                        None => {
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                        Some(len) => {
                            self.buf.push('\u{FFFD}');
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
    }

    /// Extract complete SSE blocks (terminated by a blank line) from the
    /// front of the buffer.
    fn drain_sse_blocks(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..pos + 2).collect();
            if let Some(frame) = sse_block_to_frame(&block) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Extract complete newline-terminated lines from the front of the buffer.
    fn drain_ndjson_lines(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            frames.push(if line == DONE_SENTINEL {
                Frame::Done
            } else {
                Frame::Payload(line.to_string())
            });
        }
        frames
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce one SSE block to a frame: keep only `data:` lines, strip the
/// prefix and surrounding whitespace, join multi-line payloads.
///
/// Returns `None` for blocks without a payload (comments, `event:`-only
/// blocks, keep-alive blank lines).
fn sse_block_to_frame(block: &str) -> Option<Frame> {
    let mut payload = String::new();
    for line in block.lines() {
        if let Some(data) = line.strip_prefix(DATA_PREFIX) {
            if !payload.is_empty() {
                payload.push('\n');
            }
            payload.push_str(data.trim());
        }
    }
    if payload.is_empty() {
        None
    } else if payload == DONE_SENTINEL {
        Some(Frame::Done)
    } else {
        Some(Frame::Payload(payload))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(frames: &[Frame]) -> Vec<&str> {
        frames
            .iter()
            .filter_map(|f| match f {
                Frame::Payload(p) => Some(p.as_str()),
                Frame::Done => None,
            })
            .collect()
    }

    #[test]
    fn sse_block_split_across_chunks() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.feed(br#"data: {"event":"message","answer":"Hel"#).is_empty());
        let frames = acc.feed(b"lo\"}\n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![
                Frame::Payload(r#"{"event":"message","answer":"Hello"}"#.into()),
                Frame::Done,
            ]
        );
        assert!(!acc.flush().truncated);
    }

    #[test]
    fn ndjson_lines_become_frames() {
        let mut acc = FrameAccumulator::new();
        let frames = acc.feed(b"{\"chunk\":\"Hi\"}\n{\"chunk\":\" there\"}\n");
        assert_eq!(
            payloads(&frames),
            vec![r#"{"chunk":"Hi"}"#, r#"{"chunk":" there"}"#]
        );
    }

    #[test]
    fn detection_is_sticky_once_sse() {
        let mut acc = FrameAccumulator::new();
        acc.feed(b"data: {\"chunk\":\"a\"}\n\n");
        // Bare newline-delimited JSON later in the stream must not flip the
        // accumulator to NDJSON mode.
        let frames = acc.feed(b"{\"chunk\":\"b\"}\n");
        assert!(frames.is_empty());
        let frames = acc.feed(b"\n");
        assert!(frames.is_empty(), "non-data block has no payload: {frames:?}");
    }

    #[test]
    fn detection_waits_for_evidence() {
        let mut acc = FrameAccumulator::new();
        // "data:" arriving one byte at a time must not commit to NDJSON.
        assert!(acc.feed(b"dat").is_empty());
        let frames = acc.feed(b"a: {\"chunk\":\"x\"}\n\n");
        assert_eq!(payloads(&frames), vec![r#"{"chunk":"x"}"#]);
    }

    #[test]
    fn done_sentinel_is_not_a_payload() {
        let mut acc = FrameAccumulator::new();
        let frames = acc.feed(b"data: [DONE]\n\n");
        assert_eq!(frames, vec![Frame::Done]);
    }

    #[test]
    fn ndjson_done_sentinel() {
        let mut acc = FrameAccumulator::new();
        let frames = acc.feed(b"{\"chunk\":\"x\"}\n[DONE]\n");
        assert_eq!(
            frames,
            vec![Frame::Payload(r#"{"chunk":"x"}"#.into()), Frame::Done]
        );
    }

    #[test]
    fn multibyte_character_split_mid_sequence() {
        let mut acc = FrameAccumulator::new();
        let body = "data: {\"chunk\":\"héllo\"}\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = body.iter().position(|&b| b == 0xC3).map(|i| i + 1).unwrap();
        let mut frames = acc.feed(&body[..split]);
        frames.extend(acc.feed(&body[split..]));
        assert_eq!(payloads(&frames), vec![r#"{"chunk":"héllo"}"#]);
    }

    #[test]
    fn one_byte_chunks_match_single_feed() {
        let body = "data: {\"answer\":\"Hé☃\"}\n\ndata: [DONE]\n\n".as_bytes();

        let mut whole = FrameAccumulator::new();
        let mut expected = whole.feed(body);
        expected.extend(whole.flush().frames);

        let mut acc = FrameAccumulator::new();
        let mut got = Vec::new();
        for byte in body {
            got.extend(acc.feed(std::slice::from_ref(byte)));
        }
        got.extend(acc.flush().frames);

        assert_eq!(got, expected);
    }

    #[test]
    fn flush_salvages_unterminated_sse_data_line() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.feed(br#"data: {"answer":"partial"#).is_empty());
        let flush = acc.flush();
        assert_eq!(
            flush.frames,
            vec![Frame::Payload(r#"{"answer":"partial"#.into())]
        );
        assert!(flush.truncated);
    }

    #[test]
    fn flush_salvaged_done_is_a_clean_close() {
        let mut acc = FrameAccumulator::new();
        acc.feed(b"data: {\"chunk\":\"x\"}\n\ndata: [DONE]");
        let flush = acc.flush();
        assert_eq!(flush.frames, vec![Frame::Done]);
        assert!(!flush.truncated);
    }

    #[test]
    fn flush_reports_ndjson_leftover_as_truncated() {
        let mut acc = FrameAccumulator::new();
        acc.feed(b"{\"chunk\":\"a\"}\n{\"chunk\":\"cut off");
        let flush = acc.flush();
        assert!(flush.frames.is_empty());
        assert!(flush.truncated);
    }

    #[test]
    fn flush_on_empty_buffer_is_clean() {
        let mut acc = FrameAccumulator::new();
        acc.feed(b"{\"chunk\":\"a\"}\n");
        let flush = acc.flush();
        assert!(flush.frames.is_empty());
        assert!(!flush.truncated);
    }

    #[test]
    fn pending_utf8_carry_counts_as_truncation() {
        let mut acc = FrameAccumulator::new();
        acc.feed(b"{\"chunk\":\"a\"}\n");
        acc.feed(&[0xE2, 0x98]); // first two bytes of a three-byte character
        assert!(acc.flush().truncated);
    }

    #[test]
    fn sse_block_with_only_event_line_yields_nothing() {
        let mut acc = FrameAccumulator::new();
        // Commit to SSE first, then feed a payload-free block.
        acc.feed(b"data: {\"chunk\":\"x\"}\n\n");
        let frames = acc.feed(b"event: ping\n\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn multiple_frames_in_one_chunk_stay_ordered() {
        let mut acc = FrameAccumulator::new();
        let frames = acc.feed(
            b"data: {\"chunk\":\"1\"}\n\ndata: {\"chunk\":\"2\"}\n\ndata: {\"chunk\":\"3\"}\n\n",
        );
        assert_eq!(
            payloads(&frames),
            vec![r#"{"chunk":"1"}"#, r#"{"chunk":"2"}"#, r#"{"chunk":"3"}"#]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Feed `body` through an accumulator in the given pieces and collect
        /// every frame including the flush.
        fn run_chunked(body: &[u8], cuts: &[usize]) -> (Vec<Frame>, bool) {
            let mut points: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut acc = FrameAccumulator::new();
            let mut frames = Vec::new();
            let mut start = 0;
            for point in points {
                frames.extend(acc.feed(&body[start..point]));
                start = point;
            }
            frames.extend(acc.feed(&body[start..]));
            let flush = acc.flush();
            frames.extend(flush.frames);
            (frames, flush.truncated)
        }

        proptest! {
            #[test]
            fn sse_frames_survive_arbitrary_chunking(
                texts in proptest::collection::vec("[a-zA-Z0-9éß☃ ]{0,12}", 1..6),
                cuts in proptest::collection::vec(0usize..512, 0..16),
            ) {
                let mut doc = String::new();
                for text in &texts {
                    doc.push_str(&format!("data: {{\"chunk\":\"{text}\"}}\n\n"));
                }
                doc.push_str("data: [DONE]\n\n");
                let body = doc.as_bytes();

                let (expected, clean) = run_chunked(body, &[]);
                prop_assert!(!clean);
                let (got, truncated) = run_chunked(body, &cuts);
                prop_assert_eq!(got, expected);
                prop_assert!(!truncated);
            }

            #[test]
            fn ndjson_frames_survive_arbitrary_chunking(
                texts in proptest::collection::vec("[a-zA-Z0-9éß☃ ]{0,12}", 1..6),
                cuts in proptest::collection::vec(0usize..512, 0..16),
            ) {
                let mut doc = String::new();
                for text in &texts {
                    doc.push_str(&format!("{{\"chunk\":\"{text}\"}}\n"));
                }
                let body = doc.as_bytes();

                let (expected, _) = run_chunked(body, &[]);
                let (got, truncated) = run_chunked(body, &cuts);
                prop_assert_eq!(got, expected);
                prop_assert!(!truncated);
            }
        }
    }
}
