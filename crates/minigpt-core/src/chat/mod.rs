mod chunk;
mod request;
mod response;

pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use request::{ChatCompletionRequest, ChatMessage};
pub use response::ChatCompletionResponse;
