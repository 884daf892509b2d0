//! Decoding of server-sent-event completion streams.
//!
//! The proxy relays upstream events as `data: <json>` lines terminated by
//! `data: [DONE]`. Some servers omit the `data:` prefix and send bare JSON
//! objects, one per line; both forms are accepted.

mod decoder;
mod line;

pub use decoder::{StreamDecoder, StreamItem, StreamSummary, Termination};
pub use line::{parse_line, ParsedLine, DONE_SENTINEL};
