use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A buffered (non-streaming) completion envelope.
///
/// The upstream body is kept verbatim; accessors read the fields callers
/// care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatCompletionResponse(Value);

impl ChatCompletionResponse {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Minimal envelope carrying a single assistant message
    pub fn from_content(model: &str, content: &str) -> Self {
        Self(json!({
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        }))
    }

    /// `choices[0].message.content`
    pub fn content(&self) -> Option<&str> {
        self.0
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
    }

    /// `choices[0].finish_reason`
    pub fn finish_reason(&self) -> Option<&str> {
        self.0
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finish_reason"))
            .and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_accessor() {
        let response = ChatCompletionResponse::from_content("m", "Hello");
        assert_eq!(response.content(), Some("Hello"));
        assert_eq!(response.finish_reason(), Some("stop"));
    }

    #[test]
    fn test_missing_content() {
        let response = ChatCompletionResponse::from_value(json!({"choices": []}));
        assert_eq!(response.content(), None);
    }

    #[test]
    fn test_body_is_kept_verbatim() {
        let body = json!({"id": "x", "usage": {"total_tokens": 3}, "choices": []});
        let response: ChatCompletionResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&response).unwrap(), body);
    }
}
