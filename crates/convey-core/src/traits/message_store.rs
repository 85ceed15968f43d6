//! Message store contract.
//!
//! The store persists conversation logs and pushes every newly appended
//! message to its registered listeners. Persistence itself lives outside
//! the delivery path; only this interface is depended upon.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::{ConversationId, ListenerId};
use crate::types::message::Message;

/// Receives every message appended to the store, across all conversations.
///
/// Implementations filter by conversation themselves. `on_message` is
/// called synchronously from whichever task appended the message and must
/// not block.
pub trait MessageListener: Send + Sync {
    /// Called once per appended message.
    fn on_message(&self, message: &Message);
}

/// Durable per-conversation message log with push notifications.
#[async_trait]
pub trait MessageStore: Send + Sync + fmt::Debug + 'static {
    /// Full history of a conversation, oldest first.
    async fn get_messages(&self, conversation_id: &ConversationId) -> AppResult<Vec<Message>>;

    /// Register a listener. Dropping or unsubscribing the returned handle
    /// removes it.
    ///
    /// Stores must emit notifications for a single conversation in the
    /// order messages were appended.
    fn subscribe(&self, listener: Arc<dyn MessageListener>) -> Subscription;
}

type Detach = Box<dyn FnOnce(ListenerId) + Send>;

/// Handle to a registered listener.
pub struct Subscription {
    id: ListenerId,
    detach: Option<Detach>,
}

impl Subscription {
    /// Create a handle that runs `detach` exactly once on unsubscribe or drop.
    pub fn new(id: ListenerId, detach: impl FnOnce(ListenerId) + Send + 'static) -> Self {
        Self {
            id,
            detach: Some(Box::new(detach)),
        }
    }

    /// Listener id this handle controls.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
