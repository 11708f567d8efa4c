//! Incremental stream decoder and frame assembler.
//!
//! Turns the raw byte chunks of one streamed chat reply into a single
//! growing text. The body follows the `data: <json>` line convention:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! : keep-alive
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! State is kept in three fields: the UTF-8 carry, the line buffer of text
//! not yet resolved into lines, and the assembled reply. A data line whose
//! JSON does not parse is put back at the front of the line buffer and line
//! extraction waits for the next chunk. Frames that never resolve are
//! dropped silently when the stream ends.

use tracing::debug;

use crate::decoder::Utf8StreamDecoder;
use crate::providers::extract_delta;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// One logical unit of the stream, classified from a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Blank line, `:` comment, or a line without the `data: ` prefix.
    Ignored,
    /// The `[DONE]` sentinel.
    Done,
    /// Trimmed payload of a `data: ` line.
    Data(&'a str),
}

/// Classify one line (without its `\n`). A single trailing `\r` is trimmed.
pub fn classify_line(line: &str) -> Frame<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(':') {
        return Frame::Ignored;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        Frame::Done
    } else {
        Frame::Data(payload)
    }
}

/// Per-request assembler. Create one per outgoing chat request.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    decoder: Utf8StreamDecoder,
    line_buffer: String,
    reply: String,
    done: bool,
    /// Consecutive chunks that ended with a frame put back unparsed.
    stalled_feeds: usize,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body. Returns the deltas appended to the reply
    /// while processing it, in order.
    ///
    /// Once the `[DONE]` sentinel has been seen further input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }
        let text = self.decoder.decode(chunk);
        self.line_buffer.push_str(&text);

        while let Some(newline) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline).collect();
            let line = &line[..line.len() - 1];

            match classify_line(line) {
                Frame::Ignored => continue,
                Frame::Done => {
                    self.done = true;
                    break;
                }
                Frame::Data(payload) => match serde_json::from_str(payload) {
                    Ok(value) => {
                        if let Some(delta) = extract_delta(&value) {
                            self.reply.push_str(delta);
                            deltas.push(delta.to_string());
                        }
                    }
                    Err(e) => {
                        // Re-inserting shifts the whole pending buffer, so a frame
                        // that never completes makes every later feed O(buffer).
                        self.stalled_feeds += 1;
                        debug!(
                            error = %e,
                            stalled_feeds = self.stalled_feeds,
                            pending_bytes = self.line_buffer.len() + line.len() + 1,
                            "incomplete frame, waiting for more data"
                        );
                        self.line_buffer.insert(0, '\n');
                        self.line_buffer.insert_str(0, line);
                        return deltas;
                    }
                },
            }
        }
        self.stalled_feeds = 0;
        deltas
    }

    /// Drain what is left after the transport signalled end-of-stream.
    ///
    /// Every remaining line, including an unterminated last one, is
    /// classified once more. Data frames that still fail to parse are
    /// dropped without error since no continuation can arrive. A `[DONE]`
    /// line ends the pass; nothing after it is applied. Does nothing if the
    /// sentinel was already seen.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }
        let tail = self.decoder.finish();
        self.line_buffer.push_str(&tail);
        let residual = std::mem::take(&mut self.line_buffer);

        for raw in residual.split('\n') {
            if raw.is_empty() {
                continue;
            }
            let payload = match classify_line(raw) {
                Frame::Ignored => continue,
                Frame::Done => {
                    self.done = true;
                    break;
                }
                Frame::Data(payload) => payload,
            };
            match serde_json::from_str(payload) {
                Ok(value) => {
                    if let Some(delta) = extract_delta(&value) {
                        self.reply.push_str(delta);
                        deltas.push(delta.to_string());
                    }
                }
                Err(e) => debug!(error = %e, "dropping unresolved frame at end of stream"),
            }
        }
        deltas
    }

    /// True once the `[DONE]` sentinel has been observed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The reply assembled so far.
    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn into_reply(self) -> String {
        self.reply
    }

    /// Decoded text not yet resolved into a complete line.
    pub fn pending(&self) -> &str {
        &self.line_buffer
    }

    /// Number of consecutive feeds stopped by a frame that did not parse.
    pub fn stalled_feeds(&self) -> usize {
        self.stalled_feeds
    }
}
