//! # Conversation Store
//!
//! Whole-collection read-modify-write over a [`StorageBackend`]. Every
//! mutating operation loads the collection, applies the change and writes it
//! back. Write failures are logged and never surface to callers: the returned
//! collection always reflects the change.

use minigpt_core::{Conversation, Message};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::backend::StorageBackend;

/// Key holding the JSON array of conversations
pub const CONVERSATIONS_KEY: &str = "ai-minigpt-conversations";

/// Key holding the last selected model id
pub const SELECTED_MODEL_KEY: &str = "ai-minigpt-selected-model";

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Appending to an unknown conversation creates one instead of dropping the message
    pub create_missing_on_append: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            create_missing_on_append: true,
        }
    }
}

/// Shallow merge applied by [`ConversationStore::update`]
#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub messages: Option<Vec<Message>>,
}

impl ConversationPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            messages: None,
        }
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            title: None,
            messages: Some(messages),
        }
    }
}

pub struct ConversationStore<B: StorageBackend> {
    backend: B,
    options: StoreOptions,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl<B: StorageBackend> ConversationStore<B> {
    pub fn new(backend: B, options: StoreOptions) -> Self {
        Self {
            backend,
            options,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All conversations in stored order. Missing or unreadable data lists as empty.
    pub fn list(&self) -> Vec<Conversation> {
        let raw = match self.backend.get(CONVERSATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Failed to read conversations: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(conversations) => conversations,
            Err(e) => {
                error!("Stored conversations are corrupt, ignoring them: {}", e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.list().into_iter().find(|c| c.id == conversation_id)
    }

    /// Create an empty conversation and put it first in the collection
    pub fn create(&self, title: Option<&str>) -> Conversation {
        let conversation = Conversation::new(title);
        let _guard = self.write_lock.lock();

        let mut conversations = self.list();
        conversations.insert(0, conversation.clone());
        self.persist(&conversations);

        debug!("Created conversation {}", conversation.id);
        conversation
    }

    /// Append `message` to a conversation.
    ///
    /// An unknown id either creates a fresh conversation holding the message
    /// or leaves the collection untouched, per [`StoreOptions`].
    pub fn append_message(&self, conversation_id: &str, message: Message) -> Vec<Conversation> {
        let _guard = self.write_lock.lock();
        let mut conversations = self.list();

        match conversations.iter_mut().find(|c| c.id == conversation_id) {
            Some(conversation) => conversation.push_message(message),
            None if self.options.create_missing_on_append => {
                let mut conversation = Conversation::new(None);
                warn!(
                    "Conversation {} not found on append, created {}",
                    conversation_id, conversation.id
                );
                conversation.push_message(message);
                conversations.insert(0, conversation);
            }
            None => {
                warn!(
                    "Conversation {} not found on append, message dropped",
                    conversation_id
                );
                return conversations;
            }
        }

        self.persist(&conversations);
        conversations
    }

    /// Shallow-merge `patch` into a conversation; unknown ids are a no-op
    pub fn update(&self, conversation_id: &str, patch: ConversationPatch) -> Vec<Conversation> {
        let _guard = self.write_lock.lock();
        let mut conversations = self.list();

        let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) else {
            debug!("Conversation {} not found on update", conversation_id);
            return conversations;
        };

        if let Some(title) = patch.title {
            conversation.title = title;
        }
        if let Some(messages) = patch.messages {
            conversation.messages = messages;
        }
        conversation.touch();

        self.persist(&conversations);
        conversations
    }

    /// Replace one message's content, appending an assistant message with
    /// that id if it is not there yet. Unknown conversations are a no-op.
    pub fn update_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        content: &str,
    ) -> Vec<Conversation> {
        let _guard = self.write_lock.lock();
        let mut conversations = self.list();

        let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) else {
            debug!("Conversation {} not found on message update", conversation_id);
            return conversations;
        };

        match conversation.message_mut(message_id) {
            Some(message) => {
                message.content = content.to_string();
                conversation.touch();
            }
            None => conversation.push_message(Message::assistant(content).with_id(message_id)),
        }

        self.persist(&conversations);
        conversations
    }

    /// Remove a conversation; removing an unknown id is not an error
    pub fn delete(&self, conversation_id: &str) -> Vec<Conversation> {
        let _guard = self.write_lock.lock();
        let mut conversations = self.list();

        let before = conversations.len();
        conversations.retain(|c| c.id != conversation_id);
        if conversations.len() != before {
            self.persist(&conversations);
            debug!("Deleted conversation {}", conversation_id);
        }
        conversations
    }

    pub fn selected_model(&self) -> Option<String> {
        match self.backend.get(SELECTED_MODEL_KEY) {
            Ok(model) => model.filter(|m| !m.is_empty()),
            Err(e) => {
                error!("Failed to read selected model: {}", e);
                None
            }
        }
    }

    pub fn set_selected_model(&self, model_id: &str) {
        if let Err(e) = self.backend.set(SELECTED_MODEL_KEY, model_id) {
            error!("Failed to save selected model: {}", e);
        }
    }

    fn persist(&self, conversations: &[Conversation]) {
        let json = match serde_json::to_string(conversations) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize conversations: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.set(CONVERSATIONS_KEY, &json) {
            error!("Failed to save conversations: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, MemoryBackend};
    use crate::error::{StorageError, StorageResult};
    use minigpt_core::{Role, DEFAULT_TITLE};
    use tempfile::TempDir;

    fn memory_store() -> ConversationStore<MemoryBackend> {
        ConversationStore::new(MemoryBackend::new(), StoreOptions::default())
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        assert!(memory_store().list().is_empty());
    }

    #[test]
    fn test_create_prepends_and_persists() {
        let store = memory_store();
        let first = store.create(None);
        let second = store.create(Some("Second"));

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);
        assert_eq!(list[1].title, DEFAULT_TITLE);
        assert_eq!(list[0].title, "Second");
    }

    #[test]
    fn test_append_message_lands_last() {
        let store = memory_store();
        let conv = store.create(None);

        store.append_message(&conv.id, Message::user("one"));
        let updated = store.append_message(&conv.id, Message::assistant("two"));

        let conv = updated.iter().find(|c| c.id == conv.id).unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.last_message().unwrap().content, "two");
        assert!(conv.updated_at >= conv.last_message().unwrap().timestamp);

        assert_eq!(store.get(&conv.id).unwrap().messages.len(), 2);
    }

    #[test]
    fn test_append_to_missing_creates_conversation() {
        let store = memory_store();
        let updated = store.append_message("ghost", Message::user("hello"));

        assert_eq!(updated.len(), 1);
        assert_ne!(updated[0].id, "ghost");
        assert_eq!(updated[0].messages[0].content, "hello");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_append_to_missing_without_fallback() {
        let store = ConversationStore::new(
            MemoryBackend::new(),
            StoreOptions {
                create_missing_on_append: false,
            },
        );
        store.create(None);

        let updated = store.append_message("ghost", Message::user("hello"));
        assert_eq!(updated.len(), 1);
        assert!(updated[0].messages.is_empty());
    }

    #[test]
    fn test_update_title_and_missing_id() {
        let store = memory_store();
        let conv = store.create(None);

        let updated = store.update(&conv.id, ConversationPatch::title("Renamed"));
        assert_eq!(updated[0].title, "Renamed");
        assert!(updated[0].updated_at >= conv.updated_at);

        let before = store.list();
        let after = store.update("nope", ConversationPatch::title("x"));
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_messages_replaces_list() {
        let store = memory_store();
        let conv = store.create(None);
        store.append_message(&conv.id, Message::user("old"));

        let updated = store.update(
            &conv.id,
            ConversationPatch::messages(vec![Message::user("new")]),
        );
        assert_eq!(updated[0].messages.len(), 1);
        assert_eq!(updated[0].messages[0].content, "new");
        assert_eq!(updated[0].title, DEFAULT_TITLE);
    }

    #[test]
    fn test_update_message_in_place_and_insert() {
        let store = memory_store();
        let conv = store.create(None);
        store.append_message(&conv.id, Message::assistant("").with_id("a1"));

        store.update_message(&conv.id, "a1", "Hello");
        let conv_now = store.get(&conv.id).unwrap();
        assert_eq!(conv_now.messages.len(), 1);
        assert_eq!(conv_now.message("a1").unwrap().content, "Hello");

        store.update_message(&conv.id, "a2", "fresh");
        let conv_now = store.get(&conv.id).unwrap();
        assert_eq!(conv_now.messages.len(), 2);
        assert_eq!(conv_now.message("a2").unwrap().role, Role::Assistant);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = memory_store();
        let keep = store.create(None);
        let gone = store.create(None);

        assert_eq!(store.delete(&gone.id).len(), 1);
        let remaining = store.delete(&gone.id);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn test_corrupt_data_lists_empty() {
        let backend = MemoryBackend::new();
        backend.set(CONVERSATIONS_KEY, "{not an array").unwrap();
        let store = ConversationStore::new(backend, StoreOptions::default());

        assert!(store.list().is_empty());
        store.create(None);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_selected_model_round_trip() {
        let store = memory_store();
        assert_eq!(store.selected_model(), None);
        store.set_selected_model("deepseek");
        assert_eq!(store.selected_model().as_deref(), Some("deepseek"));
    }

    struct ReadOnlyBackend;

    impl StorageBackend for ReadOnlyBackend {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::other("quota exceeded"))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_does_not_fail_operation() {
        let store = ConversationStore::new(ReadOnlyBackend, StoreOptions::default());
        let conv = store.create(None);

        let updated = store.append_message(&conv.id, Message::user("hi"));
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].messages[0].content, "hi");
        store.set_selected_model("gpt-5");
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let conv_id = {
            let store = ConversationStore::new(
                FileBackend::new(temp_dir.path()).unwrap(),
                StoreOptions::default(),
            );
            let conv = store.create(Some("Persistent"));
            store.append_message(&conv.id, Message::user("remember me"));
            store.set_selected_model("gpt-5");
            conv.id
        };

        let store = ConversationStore::new(
            FileBackend::new(temp_dir.path()).unwrap(),
            StoreOptions::default(),
        );
        let conv = store.get(&conv_id).unwrap();
        assert_eq!(conv.title, "Persistent");
        assert_eq!(conv.messages[0].content, "remember me");
        assert_eq!(store.selected_model().as_deref(), Some("gpt-5"));
    }
}
