//! `POST /api/chat`

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use minigpt_core::ChatCompletionRequest;
use tracing::{debug, error, info, warn};

use crate::error::ProxyError;
use crate::relay::relay_events;
use crate::state::AppState;

const MISSING_TOKEN_MESSAGE: &str =
    "Upstream token not configured. Set MINIGPT_UPSTREAM_TOKEN or upstream.token in the config file";

pub async fn handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let token = state.upstream.bearer_token().map_err(|e| {
        error!("Rejecting chat request: {}", e);
        ProxyError::MissingCredential(MISSING_TOKEN_MESSAGE.to_string())
    })?;

    let request: ChatCompletionRequest =
        serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    info!(
        "Chat request: model={}, messages={}, stream={}",
        request.model,
        request.messages.len(),
        request.is_streaming()
    );

    let url = state.upstream.chat_completions_url();
    let upstream = state
        .http
        .post(&url)
        .bearer_auth(token)
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            error!("Upstream request to {} failed: {}", url, e);
            ProxyError::Upstream(e.to_string())
        })?;

    let status = upstream.status();
    debug!("Upstream responded with {}", status);

    if !status.is_success() {
        return relay_error(upstream).await;
    }

    if request.is_streaming() {
        Ok(stream_response(upstream))
    } else {
        buffered_response(upstream).await
    }
}

/// Pass an upstream failure through with its status, body and content type
async fn relay_error(upstream: reqwest::Response) -> Result<Response, ProxyError> {
    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    warn!(
        "Upstream error {}: {}",
        status.as_u16(),
        String::from_utf8_lossy(&body[..body.len().min(200)])
    );

    let mut headers = HeaderMap::new();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    Ok((status, headers, body).into_response())
}

async fn buffered_response(upstream: reqwest::Response) -> Result<Response, ProxyError> {
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    Ok((StatusCode::OK, headers, body).into_response())
}

fn stream_response(upstream: reqwest::Response) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );

    let body = Body::from_stream(relay_events(upstream.bytes_stream()));
    (StatusCode::OK, headers, body).into_response()
}
