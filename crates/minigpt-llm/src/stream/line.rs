use minigpt_core::ChatCompletionChunk;
use serde_json::Value;

/// Payload that ends a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of one trimmed, non-empty event-stream line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A completion chunk. `content` may be empty (e.g. role-only deltas).
    Delta {
        content: String,
        finish_reason: Option<String>,
    },
    /// The payload was not valid JSON
    Error { payload: String, message: String },
    /// `data: [DONE]`
    Done,
    /// Comments, `event:` lines, JSON without `choices`
    Unrecognized,
}

/// Classify a single line
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();

    if let Some(payload) = line.strip_prefix("data:") {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return ParsedLine::Done;
        }
        if payload.is_empty() {
            return ParsedLine::Unrecognized;
        }
        return parse_payload(payload);
    }

    if line.starts_with('{') {
        return parse_payload(line);
    }

    ParsedLine::Unrecognized
}

fn parse_payload(payload: &str) -> ParsedLine {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            return ParsedLine::Error {
                payload: payload.to_string(),
                message: e.to_string(),
            }
        }
    };

    // Valid JSON of the wrong shape is not a parse failure
    let Ok(chunk) = serde_json::from_value::<ChatCompletionChunk>(value) else {
        return ParsedLine::Unrecognized;
    };
    if chunk.first_choice().is_none() {
        return ParsedLine::Unrecognized;
    }

    ParsedLine::Delta {
        content: chunk.content().unwrap_or_default().to_string(),
        finish_reason: chunk
            .finish_reason()
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    }
}
