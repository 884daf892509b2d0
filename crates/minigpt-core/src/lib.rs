//! # minigpt-core
//!
//! Shared types for the minigpt workspace:
//!
//! - [`types`] - the persisted data model (`Conversation`, `Message`, `Role`)
//! - [`chat`] - OpenAI-compatible wire types exchanged with the proxy
//! - [`models`] - the static table of selectable models
//! - [`id`] - time-based identifier generation

pub mod chat;
pub mod id;
pub mod models;
pub mod types;

pub use chat::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChunkChoice,
    ChunkDelta,
};
pub use id::{next_id, now_millis};
pub use models::{model_info, next_model, ModelInfo, AVAILABLE_MODELS, DEFAULT_MODEL};
pub use types::{Conversation, Message, MessageId, Role, Timestamp, DEFAULT_TITLE};
