//! Incremental frame parser for the client side of the stream. Bytes
//! are buffered until a full `\n\n`-terminated frame is available, so a
//! frame split across reads at any byte offset parses identically to
//! the whole stream arriving at once.

use braid_types::EventEnvelope;

pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Feed one read's worth of bytes; returns every envelope completed
    /// by it. Malformed frames are logged and discarded without
    /// aborting the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<EventEnvelope> {
        self.buffer.extend_from_slice(bytes);

        let mut envelopes = Vec::new();
        while let Some(end) = find_delimiter(&self.buffer) {
            let frame_bytes: Vec<u8> = self.buffer.drain(..end + 2).collect();
            match std::str::from_utf8(&frame_bytes) {
                Ok(text) => {
                    if let Some(envelope) = parse_frame(text) {
                        envelopes.push(envelope);
                    }
                }
                Err(e) => {
                    tracing::warn!("dropping non-UTF-8 frame: {}", e);
                }
            }
        }
        envelopes
    }

    /// Bytes held back waiting for a frame terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

fn parse_frame(text: &str) -> Option<EventEnvelope> {
    let mut name = None;
    let mut data = None;
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("event: ") {
            name = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data: ") {
            data = Some(value);
        }
    }

    let (name, data) = match (name, data) {
        (Some(name), Some(data)) => (name, data),
        _ => {
            tracing::warn!("dropping frame without event/data lines");
            return None;
        }
    };

    let body: serde_json::Value = match serde_json::from_str(data) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(event = name, "dropping frame with malformed JSON: {}", e);
            return None;
        }
    };

    let envelope = EventEnvelope::from_wire(name, &body);
    if envelope.is_none() {
        tracing::warn!(event = name, "dropping frame with unrecognized payload");
    }
    envelope
}
