mod conversation;
mod message;

pub use conversation::{Conversation, DEFAULT_TITLE};
pub use message::{Message, MessageId, Role, Timestamp};
