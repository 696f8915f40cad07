//! Code playground adapter.
//!
//! Uses the Gemini text endpoint with an instruction template asking for a
//! single self-contained code block.

use crate::adapter::{Generation, ProviderAdapter};
use crate::gemini_api_adapter::GeminiTextAdapter;
use crate::transport::RetryingTransport;
use async_trait::async_trait;
use fiesta_core::{ModelKind, Prompt, Result};
use std::sync::Arc;

pub fn code_instruction(request: &str) -> String {
    format!(
        "Generate a complete and well-commented code snippet based on the following request: {request}. \
         The code should be fully functional. Only return the code block, no extra text."
    )
}

#[derive(Clone)]
pub struct GeminiCodeAdapter {
    inner: GeminiTextAdapter,
    name: String,
}

impl GeminiCodeAdapter {
    pub fn new(
        transport: Arc<RetryingTransport>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            name: format!("gemini-code:{model}"),
            inner: GeminiTextAdapter::new(transport, base_url, model),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiCodeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Code
    }

    /// Text only: neither the attached image nor the web search tag is sent.
    async fn generate(&self, prompt: &Prompt, credential: &str) -> Result<Generation> {
        let code = self
            .inner
            .complete(code_instruction(&prompt.text), None, credential)
            .await?;
        Ok(Generation::Code(code))
    }
}
