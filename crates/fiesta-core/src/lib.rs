pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod model;
pub mod pane;
pub mod secret;

// Re-export common types
pub use conversation::{CodeSlot, ConversationStore, StoreEvent};
pub use error::{FiestaError, Result};
pub use message::{ImagePayload, Message, MessageId, MessagePatch, Prompt, Sender};
pub use model::{Model, ModelCatalog, ModelKind, Provider};
pub use pane::PaneSet;
pub use secret::{CredentialProvider, StaticCredentials};
