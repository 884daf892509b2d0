use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures the proxy answers itself, without an upstream response to relay
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    MissingCredential(String),

    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("upstream unreachable: {0}")]
    Upstream(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ProxyError::MissingCredential(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message }),
            ),
            ProxyError::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body", "details": details }),
            ),
            ProxyError::Upstream(details) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to reach upstream API", "details": details }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ProxyError::MissingCredential("not configured".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ProxyError::InvalidRequest("eof".into()), StatusCode::BAD_REQUEST),
            (ProxyError::Upstream("refused".into()), StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
