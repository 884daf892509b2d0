use axum::{response::IntoResponse, Json};
use minigpt_core::{AVAILABLE_MODELS, DEFAULT_MODEL};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn models() -> impl IntoResponse {
    Json(json!({
        "models": AVAILABLE_MODELS,
        "default": DEFAULT_MODEL,
    }))
}
