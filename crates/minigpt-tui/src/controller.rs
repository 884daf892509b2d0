//! Conversation orchestration.
//!
//! The controller owns the store and the UI's copy of the current
//! conversation. Completion and title tasks run detached and report back as
//! [`ControllerEvent`]s over one channel; [`Controller::apply`] is the only
//! place those results mutate state, so they are applied one at a time in
//! receive order.

use std::sync::Arc;

use minigpt_core::{
    model_info, next_model, ChatCompletionRequest, ChatMessage, Conversation, Message, MessageId,
    Role, DEFAULT_MODEL,
};
use minigpt_llm::{CompletionApi, TitleGenerator};
use minigpt_session::{ConversationPatch, ConversationStore, StorageBackend};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// System message sent ahead of every conversation
const CHAT_SYSTEM_PROMPT: &str = "not chat";
const CHAT_TEMPERATURE: f32 = 0.7;
const EMPTY_REPLY: &str = "No response received";

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Append streamed text to the assistant message
    Delta {
        conversation_id: String,
        message_id: MessageId,
        text: String,
    },
    /// Replace the assistant message (buffered fallback or error text)
    Replace {
        conversation_id: String,
        message_id: MessageId,
        content: String,
    },
    /// The completion task is over
    Finished {
        conversation_id: String,
        message_id: MessageId,
        error: Option<String>,
    },
    TitleGenerated {
        conversation_id: String,
        title: String,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("a response is still being generated")]
    Busy,
    #[error("message is empty")]
    EmptyMessage,
}

pub struct Controller<B: StorageBackend> {
    store: ConversationStore<B>,
    api: Arc<dyn CompletionApi>,
    titles: Arc<TitleGenerator>,
    model: String,
    conversations: Vec<Conversation>,
    current: Option<Conversation>,
    in_flight: Option<MessageId>,
    last_error: Option<String>,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: UnboundedReceiver<ControllerEvent>,
}

impl<B: StorageBackend> Controller<B> {
    pub fn new(store: ConversationStore<B>, api: Arc<dyn CompletionApi>) -> Self {
        let titles = Arc::new(TitleGenerator::new(api.clone(), DEFAULT_MODEL));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            store,
            api,
            titles,
            model: DEFAULT_MODEL.to_string(),
            conversations: Vec::new(),
            current: None,
            in_flight: None,
            last_error: None,
            events_tx,
            events_rx,
        }
    }

    /// Restore the saved model and select the most recent conversation
    pub fn load(&mut self) {
        self.conversations = self.store.list();
        if let Some(saved) = self.store.selected_model() {
            self.model = model_info(&saved).id.to_string();
        }
        self.current = self.conversations.first().cloned();
        info!(
            "Loaded {} conversations, model {}",
            self.conversations.len(),
            self.model
        );
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Id of the assistant message currently receiving text
    pub fn streaming_message_id(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Error of the last completion that failed, cleared by the next send
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn new_conversation(&mut self) {
        let conversation = self.store.create(None);
        self.conversations = self.store.list();
        self.current = Some(conversation);
    }

    pub fn select_conversation(&mut self, conversation_id: &str) -> bool {
        match self.conversations.iter().find(|c| c.id == conversation_id) {
            Some(conversation) => {
                self.current = Some(conversation.clone());
                true
            }
            None => false,
        }
    }

    /// Move the selection by `offset` within the sidebar, clamped to its ends
    pub fn select_relative(&mut self, offset: isize) {
        if self.conversations.is_empty() {
            return;
        }
        let index = self
            .current_index()
            .map(|i| i as isize + offset)
            .unwrap_or(0)
            .clamp(0, self.conversations.len() as isize - 1) as usize;
        let id = self.conversations[index].id.clone();
        self.select_conversation(&id);
    }

    pub fn current_index(&self) -> Option<usize> {
        let current = self.current.as_ref()?;
        self.conversations.iter().position(|c| c.id == current.id)
    }

    /// Delete a conversation; deleting the current one selects the first remaining
    pub fn delete_conversation(&mut self, conversation_id: &str) {
        self.conversations = self.store.delete(conversation_id);
        if self.current.as_ref().map(|c| c.id.as_str()) == Some(conversation_id) {
            self.current = self.conversations.first().cloned();
        }
    }

    pub fn select_model(&mut self, model_id: &str) {
        self.model = model_info(model_id).id.to_string();
        self.store.set_selected_model(&self.model);
        debug!("Selected model {}", self.model);
    }

    pub fn cycle_model(&mut self) {
        let next = next_model(&self.model).id;
        self.select_model(next);
    }

    /// Record the user message, add an empty assistant slot and start the completion
    pub fn send_message(&mut self, content: &str) -> Result<(), ControllerError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        if self.is_busy() {
            return Err(ControllerError::Busy);
        }

        let mut conversation = match self.current.take() {
            Some(conversation) => conversation,
            None => self.store.create(None),
        };
        let conversation_id = conversation.id.clone();
        let is_first = conversation.messages.is_empty();

        let user = Message::user(content);
        self.store.append_message(&conversation_id, user.clone());
        conversation.push_message(user);

        let request = ChatCompletionRequest::new(self.model.clone())
            .with_message(ChatMessage::new(Role::System, CHAT_SYSTEM_PROMPT))
            .with_messages(conversation.to_chat_messages())
            .temperature(CHAT_TEMPERATURE);

        let assistant = Message::assistant("");
        let message_id = assistant.id.clone();
        self.store.append_message(&conversation_id, assistant.clone());
        conversation.push_message(assistant);

        self.current = Some(conversation);
        self.conversations = self.store.list();
        self.in_flight = Some(message_id.clone());
        self.last_error = None;

        self.spawn_completion(request, conversation_id.clone(), message_id);
        if is_first {
            self.spawn_title(conversation_id, content.to_string());
        }
        Ok(())
    }

    fn spawn_completion(
        &self,
        request: ChatCompletionRequest,
        conversation_id: String,
        message_id: MessageId,
    ) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let streamed = {
                let tx = tx.clone();
                let (conversation_id, message_id) = (conversation_id.clone(), message_id.clone());
                let mut on_delta = move |text: &str| {
                    let _ = tx.send(ControllerEvent::Delta {
                        conversation_id: conversation_id.clone(),
                        message_id: message_id.clone(),
                        text: text.to_string(),
                    });
                };
                api.complete_streaming(request.clone(), &mut on_delta).await
            };

            let error = match streamed {
                Ok(summary) => {
                    debug!("Streaming finished with {} deltas", summary.deltas);
                    None
                }
                Err(stream_err) => {
                    warn!("Streaming failed, retrying buffered: {}", stream_err);
                    let (content, error) = match api.complete(request).await {
                        Ok(response) => (
                            response.content().unwrap_or(EMPTY_REPLY).to_string(),
                            None,
                        ),
                        Err(e) => {
                            error!("Buffered completion failed: {}", e);
                            (format!("Error: {}", e), Some(e.to_string()))
                        }
                    };
                    let _ = tx.send(ControllerEvent::Replace {
                        conversation_id: conversation_id.clone(),
                        message_id: message_id.clone(),
                        content,
                    });
                    error
                }
            };

            let _ = tx.send(ControllerEvent::Finished {
                conversation_id,
                message_id,
                error,
            });
        });
    }

    fn spawn_title(&self, conversation_id: String, first_message: String) {
        let titles = self.titles.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let title = titles.generate(&first_message).await;
            let _ = tx.send(ControllerEvent::TitleGenerated {
                conversation_id,
                title,
            });
        });
    }

    /// Apply every event already queued; returns how many were applied
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return applied,
            }
        }
    }

    /// Wait for the next event
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    pub fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Delta {
                conversation_id,
                message_id,
                text,
            } => {
                let content = match self.current_message_mut(&conversation_id, &message_id) {
                    Some(message) => {
                        message.append(&text);
                        Some(message.content.clone())
                    }
                    None => self
                        .store
                        .get(&conversation_id)
                        .and_then(|c| c.message(&message_id).map(|m| m.content.clone() + &text)),
                };
                if let Some(content) = content {
                    self.conversations =
                        self.store
                            .update_message(&conversation_id, &message_id, &content);
                }
            }
            ControllerEvent::Replace {
                conversation_id,
                message_id,
                content,
            } => {
                if let Some(message) = self.current_message_mut(&conversation_id, &message_id) {
                    message.content = content.clone();
                }
                self.conversations = self
                    .store
                    .update_message(&conversation_id, &message_id, &content);
            }
            ControllerEvent::Finished {
                conversation_id,
                message_id,
                error,
            } => {
                debug!("Completion finished for {}", conversation_id);
                if self.in_flight.as_deref() == Some(message_id.as_str()) {
                    self.in_flight = None;
                }
                self.last_error = error;
            }
            ControllerEvent::TitleGenerated {
                conversation_id,
                title,
            } => {
                if let Some(current) = self.current.as_mut().filter(|c| c.id == conversation_id) {
                    current.title = title.clone();
                }
                self.conversations = self
                    .store
                    .update(&conversation_id, ConversationPatch::title(title));
            }
        }
    }

    fn current_message_mut(
        &mut self,
        conversation_id: &str,
        message_id: &str,
    ) -> Option<&mut Message> {
        self.current
            .as_mut()
            .filter(|c| c.id == conversation_id)
            .and_then(|c| c.message_mut(message_id))
    }
}
