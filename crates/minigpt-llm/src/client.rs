use async_trait::async_trait;
use futures::StreamExt;
use minigpt_core::{ChatCompletionRequest, ChatCompletionResponse};
use reqwest::{header, Client, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::CompletionApi;
use crate::error::{extract_error_message, LlmError, Result};
use crate::stream::{StreamDecoder, StreamItem, StreamSummary, Termination};

/// HTTP client for the proxy's `POST /api/chat`
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    base_url: String,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Send with `stream: false` and return the JSON envelope
    pub async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let request = request.streaming(false);
        debug!(
            "Buffered completion: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self.send(&request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(ChatCompletionResponse::from_value(value))
    }

    /// Send with `stream: true`, invoking `on_delta` for each text fragment
    pub async fn complete_streaming<F>(
        &self,
        request: ChatCompletionRequest,
        mut on_delta: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(&str) + Send,
    {
        let request = request.streaming(true);
        debug!(
            "Streaming completion: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self.send(&request).await?;
        if response.content_length() == Some(0) {
            return Err(LlmError::Stream("no response body".to_string()));
        }
        debug!(
            "Stream opened, content-type: {:?}",
            response.headers().get(header::CONTENT_TYPE)
        );

        let mut body = response.bytes_stream();
        let mut decoder = StreamDecoder::new();
        let mut deltas = 0usize;
        let mut dispatch = |items: Vec<StreamItem>, deltas: &mut usize| {
            for item in items {
                if let StreamItem::Delta(text) = item {
                    *deltas += 1;
                    on_delta(&text);
                }
            }
        };

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!("Stream read failed after {} deltas: {}", deltas, e);
                LlmError::Stream(e.to_string())
            })?;
            dispatch(decoder.feed(&chunk), &mut deltas);
            if decoder.is_terminated() {
                break;
            }
        }
        dispatch(decoder.finish(), &mut deltas);

        let termination = decoder
            .termination()
            .cloned()
            .unwrap_or(Termination::EndOfStream);
        if deltas == 0 {
            warn!("Stream finished without content ({:?})", termination);
        } else {
            info!("Stream finished: {} deltas, {:?}", deltas, termination);
        }

        Ok(StreamSummary {
            deltas,
            termination,
        })
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<Response> {
        let response = self
            .http
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status.as_u16(), &body);
        warn!("Completion request failed: {} - {}", status.as_u16(), message);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CompletionApi for CompletionClient {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        CompletionClient::complete(self, request).await
    }

    async fn complete_streaming(
        &self,
        request: ChatCompletionRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamSummary> {
        CompletionClient::complete_streaming(self, request, |text: &str| on_delta(text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minigpt_core::{ChatMessage, Role};

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest::new("grok-4-fast").with_message(ChatMessage::new(Role::User, "hi"))
    }

    #[tokio::test]
    async fn test_streaming_collects_deltas() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"stream": true, "model": "grok-4-fast"}),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = CompletionClient::new(server.url());
        let mut seen = Vec::new();
        let summary = client
            .complete_streaming(request(), |d| seen.push(d.to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(seen, vec!["He", "llo"]);
        assert_eq!(summary.deltas, 2);
        assert_eq!(summary.termination, Termination::Done);
    }

    #[tokio::test]
    async fn test_streaming_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"rate limited"}"#)
            .create_async()
            .await;

        let client = CompletionClient::new(server.url());
        let mut called = false;
        let err = client
            .complete_streaming(request(), |_| called = true)
            .await
            .unwrap_err();

        assert!(!called);
        assert_eq!(err.status(), Some(429));
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_buffered_completion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"stream": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Hello there"},"finish_reason":"stop"}]}"#,
            )
            .create_async()
            .await;

        let client = CompletionClient::new(format!("{}/", server.url()));
        let response = client.complete(request()).await.unwrap();
        assert_eq!(response.content(), Some("Hello there"));
    }

    #[tokio::test]
    async fn test_buffered_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url());
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_stream_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let client = CompletionClient::new(server.url());
        let err = client.complete_streaming(request(), |_| {}).await.unwrap_err();
        assert_eq!(err, LlmError::Stream("no response body".to_string()));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = CompletionClient::new("http://127.0.0.1:1");
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }

    #[tokio::test]
    async fn test_trait_object_streaming() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("{\"choices\":[{\"delta\":{\"content\":\"bare\"},\"finish_reason\":\"stop\"}]}")
            .create_async()
            .await;

        let api: std::sync::Arc<dyn CompletionApi> =
            std::sync::Arc::new(CompletionClient::new(server.url()));
        let mut out = String::new();
        let summary = api
            .complete_streaming(request(), &mut |d: &str| out.push_str(d))
            .await
            .unwrap();

        assert_eq!(out, "bare");
        assert_eq!(
            summary.termination,
            Termination::FinishReason("stop".to_string())
        );
    }
}
