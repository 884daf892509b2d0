//! Conversation title generation

use std::sync::Arc;

use minigpt_core::{ChatCompletionRequest, ChatMessage, Role, DEFAULT_TITLE};
use tracing::{debug, warn};

use crate::api::CompletionApi;

/// Longest accepted generated title, in characters
pub const TITLE_MAX_CHARS: usize = 50;

const TITLE_SYSTEM_PROMPT: &str =
    "You name conversations. Reply with a short title and nothing else.";
const TITLE_TEMPERATURE: f32 = 0.7;
const TITLE_MAX_TOKENS: u32 = 20;

/// Produces a short title from a conversation's first user message
pub struct TitleGenerator {
    api: Arc<dyn CompletionApi>,
    model: String,
}

impl TitleGenerator {
    pub fn new(api: Arc<dyn CompletionApi>, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }

    /// Generate a title. Never fails: any problem yields [`fallback_title`].
    pub async fn generate(&self, first_message: &str) -> String {
        if first_message.trim().is_empty() {
            return DEFAULT_TITLE.to_string();
        }

        let request = ChatCompletionRequest::new(self.model.clone())
            .with_message(ChatMessage::new(Role::System, TITLE_SYSTEM_PROMPT))
            .with_message(ChatMessage::new(Role::User, title_prompt(first_message)))
            .temperature(TITLE_TEMPERATURE)
            .max_tokens(TITLE_MAX_TOKENS);

        match self.api.complete(request).await {
            Ok(response) => match response.content().and_then(clean_title) {
                Some(title) => {
                    debug!("Generated title: {}", title);
                    title
                }
                None => {
                    debug!("Rejected generated title {:?}", response.content());
                    fallback_title(first_message)
                }
            },
            Err(e) => {
                warn!("Failed to generate title: {}", e);
                fallback_title(first_message)
            }
        }
    }
}

fn title_prompt(first_message: &str) -> String {
    format!(
        "Generate a concise title (maximum 5 words) for a conversation that starts with: \"{}\"\n\nRespond with only the title, nothing else.",
        first_message
    )
}

/// Accept a model reply as a title: non-empty and at most
/// [`TITLE_MAX_CHARS`] once trimmed, with one surrounding quote stripped
/// from each end.
pub fn clean_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > TITLE_MAX_CHARS {
        return None;
    }

    let is_quote = |c: char| c == '"' || c == '\'';
    let mut title = trimmed;
    if let Some(rest) = title.strip_prefix(is_quote) {
        title = rest;
    }
    if let Some(rest) = title.strip_suffix(is_quote) {
        title = rest;
    }

    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// First [`TITLE_MAX_CHARS`] characters of the message, trimmed, or the default title
pub fn fallback_title(message: &str) -> String {
    let head: String = message.chars().take(TITLE_MAX_CHARS).collect();
    let head = head.trim();
    if head.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        head.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, Result};
    use crate::stream::StreamSummary;
    use async_trait::async_trait;
    use minigpt_core::ChatCompletionResponse;
    use parking_lot::Mutex;

    struct ScriptedApi {
        reply: Result<String>,
        requests: Mutex<Vec<ChatCompletionRequest>>,
    }

    impl ScriptedApi {
        fn new(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionApi for ScriptedApi {
        async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
            self.requests.lock().push(request);
            self.reply
                .clone()
                .map(|text| ChatCompletionResponse::from_content("test", &text))
        }

        async fn complete_streaming(
            &self,
            _request: ChatCompletionRequest,
            _on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<StreamSummary> {
            unreachable!("titles are generated with buffered requests")
        }
    }

    #[tokio::test]
    async fn test_empty_message_skips_network() {
        let api = ScriptedApi::new(Ok("Unused".to_string()));
        let generator = TitleGenerator::new(api.clone(), "grok-4-fast");

        assert_eq!(generator.generate("   ").await, DEFAULT_TITLE);
        assert!(api.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_request_shape() {
        let api = ScriptedApi::new(Ok("Rust Lifetimes".to_string()));
        let generator = TitleGenerator::new(api.clone(), "grok-4-fast");

        assert_eq!(generator.generate("explain lifetimes").await, "Rust Lifetimes");

        let requests = api.requests.lock();
        let request = &requests[0];
        assert_eq!(request.model, "grok-4-fast");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(20));
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.contains("explain lifetimes"));
    }

    #[tokio::test]
    async fn test_strips_quotes() {
        let api = ScriptedApi::new(Ok("  \"Borrow Checker Basics\" ".to_string()));
        let generator = TitleGenerator::new(api, "m");
        assert_eq!(generator.generate("hi").await, "Borrow Checker Basics");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_message_prefix() {
        let api = ScriptedApi::new(Err(LlmError::Network("down".to_string())));
        let generator = TitleGenerator::new(api, "m");
        let message = format!("{}tail", "x".repeat(TITLE_MAX_CHARS));

        assert_eq!(generator.generate(&message).await, "x".repeat(TITLE_MAX_CHARS));
    }

    #[tokio::test]
    async fn test_oversized_reply_falls_back() {
        let api = ScriptedApi::new(Ok("y".repeat(TITLE_MAX_CHARS + 1)));
        let generator = TitleGenerator::new(api, "m");
        assert_eq!(generator.generate("  short question ").await, "short question");
    }

    #[test]
    fn test_clean_title_edge_cases() {
        assert_eq!(clean_title("'Quoted'"), Some("Quoted".to_string()));
        assert_eq!(clean_title("\"\"Double\"\""), Some("\"Double\"".to_string()));
        assert_eq!(clean_title("\"\""), None);
        assert_eq!(clean_title(""), None);
        assert_eq!(clean_title(&"z".repeat(TITLE_MAX_CHARS)), Some("z".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn test_fallback_title() {
        assert_eq!(fallback_title(""), DEFAULT_TITLE);
        assert_eq!(fallback_title("  hello  "), "hello");
    }
}
