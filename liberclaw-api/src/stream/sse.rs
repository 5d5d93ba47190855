use crate::endpoints::chat::ChatMessage;
use std::str::Utf8Error;

/// One complete `text/event-stream` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `data` lines joined with `\n`; `None` when the frame had none.
    pub data: Option<String>,
}

/// Incremental `text/event-stream` decoder.
///
/// Frames are split on the blank line at byte level and only complete
/// frames are UTF-8 decoded, so a multi-byte character cut by a chunk
/// boundary is reassembled intact. A scan cursor remembers how far the
/// buffer has been searched, so each byte is examined once. Consumed frames
/// are skipped with a read offset and only dropped from the buffer on a
/// later `push`, once the buffer is empty or the dead prefix has grown.
#[derive(Debug)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// Start of the first unconsumed byte.
    start: usize,
    state: State,
}

/// Dead prefix size that triggers a compaction on `push`.
const COMPACT_AT: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No boundary in `buf[start..scanned]`.
    Accumulating { scanned: usize },
    /// `buf[start..end]` is a complete frame; the next one starts at `next`.
    FrameReady { end: usize, next: usize },
}

enum Boundary {
    Found { end: usize, next: usize },
    Pending { resume: usize },
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: 0,
            state: State::Accumulating { scanned: 0 },
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.compact();
        self.buf.extend_from_slice(chunk);
    }

    fn compact(&mut self) {
        let State::Accumulating { scanned } = self.state else {
            return;
        };
        if self.start == self.buf.len() {
            self.buf.clear();
        } else if self.start >= COMPACT_AT && self.start * 2 >= self.buf.len() {
            self.buf.drain(..self.start);
        } else {
            return;
        }
        self.state = State::Accumulating {
            scanned: scanned - self.start,
        };
        self.start = 0;
    }

    /// Pop the next complete frame, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> Option<Result<SseFrame, Utf8Error>> {
        loop {
            match self.state {
                State::Accumulating { scanned } => match find_boundary(&self.buf, scanned) {
                    Boundary::Found { end, next } => {
                        self.state = State::FrameReady { end, next };
                    }
                    Boundary::Pending { resume } => {
                        self.state = State::Accumulating { scanned: resume };
                        return None;
                    }
                },
                State::FrameReady { end, next } => {
                    let frame = parse_frame(&self.buf[self.start..end]);
                    self.start = next;
                    self.state = State::Accumulating { scanned: next };
                    return Some(frame);
                }
            }
        }
    }

    /// True if non-blank bytes are buffered without a terminating blank line.
    pub fn has_partial_frame(&self) -> bool {
        self.buf[self.start..].iter().any(|b| !b.is_ascii_whitespace())
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Search for `\n\n` or `\n\r\n` starting at `from`.
fn find_boundary(buf: &[u8], from: usize) -> Boundary {
    let mut i = from;
    while let Some(offset) = buf[i..].iter().position(|&b| b == b'\n') {
        let newline = i + offset;
        match buf.get(newline + 1) {
            None => return Boundary::Pending { resume: newline },
            Some(b'\n') => {
                return Boundary::Found {
                    end: newline,
                    next: newline + 2,
                };
            }
            Some(b'\r') => match buf.get(newline + 2) {
                None => return Boundary::Pending { resume: newline },
                Some(b'\n') => {
                    return Boundary::Found {
                        end: newline,
                        next: newline + 3,
                    };
                }
                Some(_) => i = newline + 1,
            },
            Some(_) => i = newline + 1,
        }
    }
    Boundary::Pending { resume: buf.len() }
}

fn parse_frame(bytes: &[u8]) -> Result<SseFrame, Utf8Error> {
    let text = std::str::from_utf8(bytes)?;

    let mut data: Option<String> = None;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        // Comments (`:`) and other fields (`event`, `id`, `retry`) are unused
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match &mut data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    Ok(SseFrame { data })
}

/// Application meaning of a frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Keepalive,
    Message(ChatMessage),
}

pub fn parse_payload(data: &str) -> Result<StreamEvent, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    if value.get("type").and_then(serde_json::Value::as_str) == Some("keepalive") {
        return Ok(StreamEvent::Keepalive);
    }
    serde_json::from_value(value).map(StreamEvent::Message)
}
