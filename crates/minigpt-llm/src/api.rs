use async_trait::async_trait;
use minigpt_core::{ChatCompletionRequest, ChatCompletionResponse};

use crate::error::Result;
use crate::stream::StreamSummary;

/// A chat completion backend
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Buffered completion
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse>;

    /// Streaming completion; `on_delta` is called once per non-empty text fragment, in order
    async fn complete_streaming(
        &self,
        request: ChatCompletionRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamSummary>;
}
