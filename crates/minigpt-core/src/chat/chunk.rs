use serde::Deserialize;

/// One streamed completion event payload.
///
/// Only the fields the client consumes are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Option<Vec<ChunkChoice>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    /// Some servers put the text under `message` even when streaming
    #[serde(default)]
    pub message: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.as_ref().and_then(|c| c.first())
    }

    /// Text carried by the first choice, preferring `delta.content`
    pub fn content(&self) -> Option<&str> {
        let choice = self.first_choice()?;
        choice
            .delta
            .as_ref()
            .and_then(|d| d.content.as_deref())
            .or_else(|| choice.message.as_ref().and_then(|m| m.content.as_deref()))
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_choice().and_then(|c| c.finish_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"He"}}]}"#).unwrap();
        assert_eq!(chunk.content(), Some("He"));
        assert_eq!(chunk.finish_reason(), None);
    }

    #[test]
    fn test_message_fallback_and_finish_reason() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"all"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some("all"));
        assert_eq!(chunk.finish_reason(), Some("stop"));
    }

    #[test]
    fn test_null_fields() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":null},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.finish_reason(), None);
    }
}
