use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the completion client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Human-readable message for a non-success response body.
///
/// Prefers the JSON `error` field (string or `error.message`), then
/// `details`, then the raw body text, then `HTTP <status>`.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let from_error = match value.get("error") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        };
        if let Some(message) = from_error {
            return message;
        }

        match value.get("details") {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let text = body.trim();
    if text.is_empty() {
        format!("HTTP {}", status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_string_field() {
        assert_eq!(
            extract_error_message(429, r#"{"error":"rate limited"}"#),
            "rate limited"
        );
    }

    #[test]
    fn test_error_object_message() {
        let body = r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        assert_eq!(extract_error_message(404, body), "model not found");
    }

    #[test]
    fn test_details_fallback() {
        let body = r#"{"details":"connection refused"}"#;
        assert_eq!(extract_error_message(502, body), "connection refused");
    }

    #[test]
    fn test_raw_text_and_status_fallback() {
        assert_eq!(extract_error_message(500, "upstream exploded"), "upstream exploded");
        assert_eq!(extract_error_message(503, "  "), "HTTP 503");
        assert_eq!(extract_error_message(400, r#"{"ok":false}"#), r#"{"ok":false}"#);
    }

    #[test]
    fn test_api_error_display() {
        let err = LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 429 - rate limited");
        assert_eq!(err.status(), Some(429));
    }
}
