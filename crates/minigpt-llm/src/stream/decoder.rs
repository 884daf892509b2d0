use tracing::{trace, warn};

use super::line::{parse_line, ParsedLine};

/// Why a stream stopped producing deltas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// `data: [DONE]`
    Done,
    /// A chunk carried a finish reason
    FinishReason(String),
    /// The body ended without either
    EndOfStream,
}

/// Output of the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Delta(String),
    Finished(Termination),
}

/// Result of a completed streaming call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub deltas: usize,
    pub termination: Termination,
}

/// Incremental line decoder over raw body bytes.
///
/// Bytes are buffered until a `\n` arrives, so neither a line nor a multi-byte
/// character split across reads is decoded early. Once terminated, further
/// input is ignored.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    termination: Option<Termination>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every complete line in `chunk` plus what was buffered before it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamItem> {
        let mut items = Vec::new();
        if self.termination.is_some() {
            return items;
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.process_line(&line[..pos], &mut items);
            if self.termination.is_some() {
                self.buffer.clear();
                break;
            }
        }
        items
    }

    /// Flush the trailing unterminated line and close the stream
    pub fn finish(&mut self) -> Vec<StreamItem> {
        let mut items = Vec::new();
        if self.termination.is_some() {
            return items;
        }

        let rest = std::mem::take(&mut self.buffer);
        self.process_line(&rest, &mut items);
        if self.termination.is_none() {
            self.terminate(Termination::EndOfStream, &mut items);
        }
        items
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    fn process_line(&mut self, raw: &[u8], items: &mut Vec<StreamItem>) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        match parse_line(line) {
            ParsedLine::Done => self.terminate(Termination::Done, items),
            ParsedLine::Delta {
                content,
                finish_reason,
            } => {
                if !content.is_empty() {
                    items.push(StreamItem::Delta(content));
                }
                if let Some(reason) = finish_reason {
                    self.terminate(Termination::FinishReason(reason), items);
                }
            }
            ParsedLine::Error { payload, message } => {
                let preview: String = payload.chars().take(100).collect();
                warn!("Skipping unparseable stream line {:?}: {}", preview, message);
            }
            ParsedLine::Unrecognized => {
                trace!("Ignoring stream line: {}", line);
            }
        }
    }

    fn terminate(&mut self, termination: Termination, items: &mut Vec<StreamItem>) {
        items.push(StreamItem::Finished(termination.clone()));
        self.termination = Some(termination);
    }
}
