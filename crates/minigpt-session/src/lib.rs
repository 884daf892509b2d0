//! # minigpt-session
//!
//! Conversation persistence. A [`ConversationStore`] keeps the whole
//! conversation collection under one key of a [`StorageBackend`] and rewrites
//! it on every mutation.
//!
//! ```ignore
//! use minigpt_session::{ConversationStore, FileBackend, StoreOptions};
//!
//! let store = ConversationStore::new(FileBackend::new("~/.minigpt/data")?, StoreOptions::default());
//! let conversation = store.create(None);
//! store.append_message(&conversation.id, Message::user("hello"));
//! ```

pub mod backend;
pub mod error;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use store::{
    ConversationPatch, ConversationStore, StoreOptions, CONVERSATIONS_KEY, SELECTED_MODEL_KEY,
};
