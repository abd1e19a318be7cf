use std::collections::VecDeque;

use anyhow::Result;

/// Line buffer for provider SSE responses. Bytes accumulate in a
/// VecDeque and complete lines are drained out as they arrive, so a
/// line split across two network chunks parses correctly.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract the next complete line (up to `\n`), trimmed.
    /// Returns None until a full line is buffered.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match std::str::from_utf8(&line_bytes) {
            Ok(line) => Some(Ok(line.trim().to_string())),
            Err(e) => Some(Err(anyhow::anyhow!("Invalid UTF-8 in stream: {}", e))),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_complete_lines() {
        let mut buffer = LineBuffer::with_capacity(64);
        buffer.extend(b"data: one\ndata: two\n");

        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: one");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: two");
        assert!(buffer.next_line().is_none());
    }

    #[test]
    fn holds_partial_line_until_complete() {
        let mut buffer = LineBuffer::with_capacity(64);
        buffer.extend(b"data: par");
        assert!(buffer.next_line().is_none());

        buffer.extend(b"tial\n");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: partial");
    }
}
