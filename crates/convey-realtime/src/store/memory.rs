//! In-memory message store for single-node deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use convey_core::result::AppResult;
use convey_core::traits::{MessageListener, MessageStore, Subscription};
use convey_core::types::{ConversationId, Message};

use super::listeners::ListenerRegistry;

/// Append-only conversation logs held in memory.
///
/// Listeners are notified while the conversation's log entry is locked,
/// so notifications for one conversation follow append order. Listeners
/// must not call back into the store from `on_message`.
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    /// Conversation → ordered log.
    logs: DashMap<ConversationId, Vec<Message>>,
    /// Registered listeners.
    listeners: Arc<ListenerRegistry>,
}

impl MemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to its conversation and notifies listeners.
    ///
    /// Messages without an id get `{conversation}|{position:07}`.
    pub fn append(&self, mut message: Message) -> Message {
        let mut log = self
            .logs
            .entry(message.conversation_id.clone())
            .or_default();

        if message.id.is_none() {
            message.id = Some(format!("{}|{:07}", message.conversation_id, log.len()));
        }
        log.push(message.clone());
        self.listeners.notify(&message);
        drop(log);

        debug!(
            conversation_id = %message.conversation_id,
            message_id = ?message.id,
            "Message appended"
        );
        message
    }

    /// Messages of a conversation after the first `watermark`.
    pub fn get_messages_from(&self, conversation_id: &ConversationId, watermark: u64) -> Vec<Message> {
        let skip = usize::try_from(watermark).unwrap_or(usize::MAX);
        self.logs
            .get(conversation_id)
            .map(|log| log.iter().skip(skip).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages stored for a conversation.
    pub fn message_count(&self, conversation_id: &ConversationId) -> usize {
        self.logs.get(conversation_id).map(|log| log.len()).unwrap_or(0)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn get_messages(&self, conversation_id: &ConversationId) -> AppResult<Vec<Message>> {
        Ok(self.get_messages_from(conversation_id, 0))
    }

    fn subscribe(&self, listener: Arc<dyn MessageListener>) -> Subscription {
        self.listeners.register(listener)
    }
}
