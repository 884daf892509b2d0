pub mod api;
pub mod client;
pub mod error;
pub mod stream;
pub mod title;

pub use api::CompletionApi;
pub use client::CompletionClient;
pub use error::{extract_error_message, LlmError, Result};
pub use stream::{parse_line, ParsedLine, StreamDecoder, StreamItem, StreamSummary, Termination};
pub use title::{clean_title, fallback_title, TitleGenerator, TITLE_MAX_CHARS};
