//! Event-stream normalization between the upstream and the client.
//!
//! Upstream lines are re-emitted one per `\n`: `data:` lines verbatim, bare
//! JSON objects with a `data: ` prefix added, everything else dropped.
//! `data: [DONE]` is forwarded and ends the relay.

use std::io;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

const DONE_LINE: &str = "data: [DONE]";

/// Line reassembly and rewriting, independent of any transport
#[derive(Debug, Default)]
pub struct LineRelay {
    buffer: Vec<u8>,
    done: bool,
    forwarded: usize,
}

impl LineRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite every complete line in `chunk`; partial lines wait for the next call
    pub fn push(&mut self, chunk: &[u8]) -> String {
        let mut out = String::new();
        if self.done {
            return out;
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.rewrite(&line[..pos], &mut out);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Rewrite a trailing line left without a newline
    pub fn finish(&mut self) -> String {
        let mut out = String::new();
        if !self.done {
            let rest = std::mem::take(&mut self.buffer);
            self.rewrite(&rest, &mut out);
        }
        out
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of data lines forwarded so far, `[DONE]` excluded
    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    fn rewrite(&mut self, raw: &[u8], out: &mut String) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            if payload.trim() == "[DONE]" {
                out.push_str(DONE_LINE);
                out.push('\n');
                self.done = true;
                return;
            }
            out.push_str(line);
            out.push('\n');
            self.forwarded += 1;
        } else if line.starts_with('{') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
            self.forwarded += 1;
        }
    }
}

/// Relay an upstream body as a normalized event stream.
///
/// An upstream read error is passed on as an error item so the client
/// connection is aborted rather than ended cleanly.
pub fn relay_events<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, io::Error>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    async_stream::stream! {
        let mut upstream = Box::pin(upstream);
        let mut relay = LineRelay::new();
        let mut failed = false;

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(chunk) => {
                    let out = relay.push(&chunk);
                    if !out.is_empty() {
                        yield Ok(Bytes::from(out));
                    }
                    if relay.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Upstream stream failed after {} lines: {}", relay.forwarded(), e);
                    failed = true;
                    yield Err(io::Error::new(io::ErrorKind::Other, e));
                    break;
                }
            }
        }

        if !failed {
            let out = relay.finish();
            if !out.is_empty() {
                yield Ok(Bytes::from(out));
            }
            debug!("Relay finished: {} lines, done={}", relay.forwarded(), relay.is_done());
        }
    }
}
