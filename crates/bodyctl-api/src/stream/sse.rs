// ── Server-Sent Events framing ──
//
// Incremental decoder for `text/event-stream` bodies. Chunks from the
// HTTP body may split lines anywhere; complete frames come out once the
// blank line terminating them has been seen.

use bytes::{Buf, BytesMut};

use crate::error::Error;

/// Upper bound on a pending line and on a frame's joined `data`.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// One raw push message: optional SSE event name plus the joined `data:`
/// lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFrame {
    pub event: Option<String>,
    pub data: String,
}

impl PushFrame {
    /// Frame without an event name (the SSE default `message` event).
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Frame with an explicit SSE event name.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}

/// Stateful `text/event-stream` decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of body bytes, returning every frame it completes.
    ///
    /// Fails with [`Error::Parse`] once a line or frame grows past
    /// [`MAX_FRAME_BYTES`]; the decoder is reset and the stream should be
    /// dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<PushFrame>, Error> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos);
            self.buf.advance(1);

            let mut line = String::from_utf8_lossy(&line).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
            if self.data_len > MAX_FRAME_BYTES {
                return Err(self.overflow("event data"));
            }
        }

        if self.buf.len() > MAX_FRAME_BYTES {
            return Err(self.overflow("line"));
        }
        Ok(frames)
    }

    fn overflow(&mut self, what: &str) -> Error {
        let preview = String::from_utf8_lossy(&self.buf[..self.buf.len().min(64)]).into_owned();
        *self = Self::default();
        Error::Parse {
            message: format!("SSE {what} exceeds {MAX_FRAME_BYTES} bytes"),
            payload: preview,
        }
    }

    fn process_line(&mut self, line: &str) -> Option<PushFrame> {
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            // Comment / keep-alive.
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => {
                self.data_len += value.len() + 1;
                self.data.push(value.to_owned());
            }
            // `id` and `retry` are not used; reconnection is client-driven.
            _ => {}
        }
        None
    }

    fn flush(&mut self) -> Option<PushFrame> {
        let event = self.event.take().filter(|e| !e.is_empty());
        self.data_len = 0;
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(PushFrame { event, data })
    }
}
