//! Model descriptors and the built-in catalog.
//!
//! A [`Model`] is defined once at startup and never mutated. Panes refer to
//! models by id; the orchestrator looks the descriptor up in the
//! [`ModelCatalog`] whenever it needs the kind or the credential family.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a model produces, which decides how its reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Text reply, streamed into the pane's placeholder message.
    Text,
    /// Single generated image, patched into the placeholder in one step.
    Image,
    /// Code block, written to the shared code slot instead of the log.
    Code,
}

/// Credential family a model is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Google,
    OpenRouter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenRouter => "openrouter",
        }
    }

    /// Human readable name, used in validation messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Gemini",
            Provider::OpenRouter => "OpenRouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Immutable description of one selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Catalog id, doubles as the pane id while the model is active.
    pub id: String,
    pub display_name: String,
    pub kind: ModelKind,
    pub provider: Provider,
    /// Model name sent on the wire. `None` uses the endpoint default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

impl Model {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ModelKind,
        provider: Provider,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            provider,
            upstream: None,
        }
    }

    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = Some(upstream.into());
        self
    }

    /// Whether a placeholder message is created for this model in each turn.
    pub fn writes_to_log(&self) -> bool {
        matches!(self.kind, ModelKind::Text | ModelKind::Image)
    }
}

/// The fixed set of models available for panes.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    /// Catalog shipped with the application.
    pub fn builtin() -> Self {
        use ModelKind::*;
        use Provider::*;

        Self::new(vec![
            Model::new("gemini-pro-vision", "Gemini Pro (Vision)", Text, Google),
            Model::new("llama-3-8b", "Llama 3.3", Text, OpenRouter)
                .with_upstream("meta-llama/llama-3.3-8b-instruct:free"),
            Model::new("qwen-7b", "Qwen", Text, OpenRouter)
                .with_upstream("qwen/qwen-2.5-7b-instruct"),
            Model::new("mistral-7b", "Mistral 7B", Text, OpenRouter)
                .with_upstream("mistralai/mistral-7b-instruct"),
            Model::new("reka-flash", "Reka Flash", Text, OpenRouter)
                .with_upstream("rekaai/reka-flash-3:free"),
            Model::new("deepseek-r1", "DeepSeek R1", Text, OpenRouter)
                .with_upstream("deepseek/deepseek-r1"),
            Model::new("imagen-gen", "Imagen (Image Generation)", Image, Google),
            Model::new("code-playground", "Code Playground", Code, Google),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
