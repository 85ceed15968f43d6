//! Listener registry: the observer list behind a message store.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use convey_core::traits::{MessageListener, Subscription};
use convey_core::types::{ListenerId, Message};

/// Concurrent set of message listeners.
///
/// Registration, removal and notification may interleave freely across
/// threads.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Listener ID → listener.
    listeners: DashMap<ListenerId, Arc<dyn MessageListener>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and returns the handle that removes it.
    pub fn register(self: &Arc<Self>, listener: Arc<dyn MessageListener>) -> Subscription {
        let id = ListenerId::new();
        self.listeners.insert(id, listener);
        debug!(listener_id = %id, "Listener registered");

        let registry = Arc::downgrade(self);
        Subscription::new(id, move |id| {
            if let Some(registry) = registry.upgrade() {
                registry.listeners.remove(&id);
                debug!(listener_id = %id, "Listener removed");
            }
        })
    }

    /// Pushes a message to every registered listener.
    ///
    /// Listeners are snapshotted first, so a callback may unsubscribe
    /// without deadlocking the registry.
    pub fn notify(&self, message: &Message) {
        let targets: Vec<Arc<dyn MessageListener>> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for listener in targets {
            listener.on_message(message);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl MessageListener for Recorder {
        fn on_message(&self, message: &Message) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(message.text.clone().unwrap_or_default());
            }
        }
    }

    #[test]
    fn test_notify_reaches_registered_listeners_only() {
        let registry = Arc::new(ListenerRegistry::new());
        let recorder = Arc::new(Recorder::default());

        let mut sub = registry.register(recorder.clone());
        registry.notify(&Message::text("c1", "u", "first"));
        sub.unsubscribe();
        registry.notify(&Message::text("c1", "u", "second"));

        assert!(registry.is_empty());
        assert_eq!(*recorder.seen.lock().expect("lock"), vec!["first"]);
    }

    #[test]
    fn test_subscription_outliving_registry_is_harmless() {
        let registry = Arc::new(ListenerRegistry::new());
        let sub = registry.register(Arc::new(Recorder::default()));
        drop(registry);
        drop(sub);
    }
}
