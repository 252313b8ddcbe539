//! Incremental `text/event-stream` decoder.
//!
//! The transport hands over arbitrary byte chunks; [`SseDecoder`]
//! reassembles them into lines and dispatches the accumulated `data`
//! field at every blank line. Only `data` matters to the pipeline
//! stream, so `event`, `id` and `retry` fields are read and dropped.

/// Stateful decoder for one event stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the line currently being read.
    line: Vec<u8>,
    /// `data` accumulated for the message in progress.
    data: Option<String>,
    /// The previous chunk ended on `\r`; swallow a leading `\n`.
    skip_lf: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every message completed by it.
    ///
    /// Line terminators are ASCII, so a multi-byte UTF-8 sequence split
    /// across chunks is always reassembled before the line is decoded.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut messages = Vec::new();

        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut messages),
                b'\r' => {
                    self.end_line(&mut messages);
                    self.skip_lf = true;
                }
                _ => self.line.push(byte),
            }
        }

        messages
    }

    fn end_line(&mut self, messages: &mut Vec<String>) {
        let line = std::mem::take(&mut self.line);

        if line.is_empty() {
            if let Some(data) = self.data.take() {
                messages.push(data);
            }
            return;
        }

        let line = String::from_utf8_lossy(&line);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };

        match field {
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            "event" | "id" | "retry" => {}
            other => tracing::trace!(field = other, "Ignoring unknown SSE field"),
        }
    }
}
