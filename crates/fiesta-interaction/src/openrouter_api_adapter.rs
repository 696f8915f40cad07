//! OpenRouter chat-completions adapter for hosted open models.

use crate::adapter::{Generation, ProviderAdapter};
use crate::gemini_api_adapter::tagged_prompt;
use crate::transport::{Endpoint, RetryingTransport};
use async_trait::async_trait;
use fiesta_core::{FiestaError, ModelKind, Prompt, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Adapter implementation that talks to OpenRouter's OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenRouterAdapter {
    transport: Arc<RetryingTransport>,
    url: String,
    model: String,
    name: String,
}

impl OpenRouterAdapter {
    pub fn new(
        transport: Arc<RetryingTransport>,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            transport,
            url: url.into(),
            name: format!("openrouter:{model}"),
            model,
        }
    }

    fn build_request(&self, prompt: &Prompt) -> ChatCompletionRequest {
        let mut content = vec![ContentPart::Text {
            text: tagged_prompt(prompt),
        }];
        if let Some(image) = &prompt.image {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            });
        }

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Text
    }

    async fn generate(&self, prompt: &Prompt, credential: &str) -> Result<Generation> {
        let endpoint = Endpoint::new(self.name.clone(), self.url.clone()).with_bearer(credential);
        let body = serde_json::to_value(self.build_request(prompt))?;
        let response = self.transport.send(&endpoint, &body).await?;

        let parsed: ChatCompletionResponse = serde_json::from_value(response.body)
            .map_err(|err| FiestaError::malformed(&self.name, err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(Generation::Text)
            .ok_or_else(|| FiestaError::malformed(&self.name, "no content in the first choice"))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
