//! Shared conversation log and the code slot.
//!
//! [`ConversationStore`] is the only place where pane tasks write their
//! results. It is append-only apart from in-place patches on response
//! messages and pruning when a pane is closed. Renderers read snapshots and
//! listen on [`ConversationStore::subscribe`] for changes.

use crate::message::{Message, MessageId, MessagePatch};
use tokio::sync::{RwLock, broadcast, watch};

const EVENT_CAPACITY: usize = 256;

/// Change notification emitted after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A message was appended at `index`.
    Appended { index: usize, id: Option<MessageId> },
    /// The message with `id` was patched in place.
    Patched { id: MessageId },
    /// `removed` messages sent by `sender` were pruned.
    Pruned { sender: String, removed: usize },
}

/// The single shared, ordered conversation log.
pub struct ConversationStore {
    messages: RwLock<Vec<Message>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Appends a message to the end of the log. Ids are assigned by the caller.
    pub async fn append(&self, message: Message) {
        let id = message.id.clone();
        let index = {
            let mut messages = self.messages.write().await;
            messages.push(message);
            messages.len() - 1
        };
        self.notify(StoreEvent::Appended { index, id });
    }

    /// Applies `patch` to the message with `id`.
    ///
    /// Returns `false` and leaves the log untouched when no such message
    /// exists, e.g. because its pane was removed mid-turn.
    pub async fn patch(&self, id: &MessageId, patch: MessagePatch) -> bool {
        let found = {
            let mut messages = self.messages.write().await;
            match messages
                .iter_mut()
                .find(|m| m.id.as_ref() == Some(id))
            {
                Some(message) => {
                    message.apply(patch);
                    true
                }
                None => false,
            }
        };

        if found {
            self.notify(StoreEvent::Patched { id: id.clone() });
        } else {
            tracing::debug!("[ConversationStore] Patch for unknown message {} ignored", id);
        }
        found
    }

    /// Removes every message sent by `pane_id`, keeping the relative order of the rest.
    pub async fn prune_sender(&self, pane_id: &str) -> usize {
        let removed = {
            let mut messages = self.messages.write().await;
            let before = messages.len();
            messages.retain(|m| !m.sender.is_pane(pane_id));
            before - messages.len()
        };
        self.notify(StoreEvent::Pruned {
            sender: pane_id.to_string(),
            removed,
        });
        removed
    }

    /// Copy of the whole log.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// Messages visible in one pane: user turns plus that pane's replies.
    pub async fn pane_view(&self, pane_id: &str) -> Vec<Message> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.visible_in(pane_id))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &MessageId) -> Option<Message> {
        self.messages
            .read()
            .await
            .iter()
            .find(|m| m.id.as_ref() == Some(id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine; renderers come and go.
        let _ = self.events.send(event);
    }
}

/// The single shared output slot of the code pane.
///
/// Cloning yields another handle to the same slot.
#[derive(Clone)]
pub struct CodeSlot {
    tx: watch::Sender<String>,
}

impl Default for CodeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSlot {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(String::new());
        Self { tx }
    }

    pub fn set(&self, content: impl Into<String>) {
        self.tx.send_replace(content.into());
    }

    pub fn get(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}
