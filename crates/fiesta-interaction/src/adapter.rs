//! The provider adapter seam.

use async_trait::async_trait;
use fiesta_core::{ImagePayload, ModelKind, Prompt, Result};

/// Result of one successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Complete text reply, streamed to the pane afterwards.
    Text(String),
    /// One generated image.
    Image(ImagePayload),
    /// Code block destined for the code slot.
    Code(String),
}

impl Generation {
    pub fn kind(&self) -> ModelKind {
        match self {
            Generation::Text(_) => ModelKind::Text,
            Generation::Image(_) => ModelKind::Image,
            Generation::Code(_) => ModelKind::Code,
        }
    }
}

/// Turns a prompt into a provider request and maps the reply back.
///
/// Implementations have no side effects besides the network call. The
/// credential is passed per call so adapters never hold keys.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    async fn generate(&self, prompt: &Prompt, credential: &str) -> Result<Generation>;
}
