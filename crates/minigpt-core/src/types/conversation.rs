use serde::{Deserialize, Serialize};

use super::message::{Message, Timestamp};
use crate::chat::ChatMessage;
use crate::id::{next_id, now_millis};

/// Title given to conversations before one is generated
pub const DEFAULT_TITLE: &str = "New Conversation";

/// A conversation and its full message history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    /// Create an empty conversation with a fresh time-based id
    pub fn new(title: Option<&str>) -> Self {
        let now = now_millis();
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        Self {
            id: next_id(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Bump `updated_at` so it never trails the latest message mutation
    pub fn touch(&mut self) {
        let latest = self
            .messages
            .iter()
            .map(|m| m.timestamp)
            .max()
            .unwrap_or(self.updated_at);
        self.updated_at = now_millis().max(latest).max(self.updated_at);
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Role/content pairs for a completion request
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(ChatMessage::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_defaults() {
        let conv = Conversation::new(None);
        assert_eq!(conv.title, DEFAULT_TITLE);
        assert!(conv.messages.is_empty());
        assert_eq!(conv.created_at, conv.updated_at);
    }

    #[test]
    fn test_new_conversation_with_title() {
        let conv = Conversation::new(Some("Rust questions"));
        assert_eq!(conv.title, "Rust questions");
    }

    #[test]
    fn test_push_message_bumps_updated_at() {
        let mut conv = Conversation::new(None);
        let msg = Message::user("hi");
        let stamp = msg.timestamp;
        conv.push_message(msg);
        assert!(conv.updated_at >= stamp);
        assert_eq!(conv.messages.len(), 1);
    }

    #[test]
    fn test_camel_case_persistence_shape() {
        let conv = Conversation::new(None);
        let value = serde_json::to_value(&conv).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_to_chat_messages() {
        let mut conv = Conversation::new(None);
        conv.push_message(Message::user("hi"));
        conv.push_message(Message::assistant("hello"));
        let chat = conv.to_chat_messages();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].role, "user");
        assert_eq!(chat[1].content, "hello");
    }
}
