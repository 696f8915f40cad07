//! Imagen `predict` adapter for image panes.

use crate::adapter::{Generation, ProviderAdapter};
use crate::transport::{Endpoint, RetryingTransport};
use async_trait::async_trait;
use fiesta_core::{FiestaError, ImagePayload, ModelKind, Prompt, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct ImagenAdapter {
    transport: Arc<RetryingTransport>,
    base_url: String,
    model: String,
    name: String,
}

impl ImagenAdapter {
    pub fn new(
        transport: Arc<RetryingTransport>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            transport,
            base_url: base_url.into(),
            name: format!("imagen:{model}"),
            model,
        }
    }

    fn endpoint(&self, api_key: &str) -> Endpoint {
        Endpoint::new(
            self.name.clone(),
            format!(
                "{}/{model}:predict?key={api_key}",
                self.base_url.trim_end_matches('/'),
                model = self.model,
            ),
        )
    }
}

#[async_trait]
impl ProviderAdapter for ImagenAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Image
    }

    /// Only the prompt text is sent; attachments and web search do not apply.
    async fn generate(&self, prompt: &Prompt, credential: &str) -> Result<Generation> {
        let request = PredictRequest {
            instances: vec![Instance {
                prompt: prompt.text.clone(),
            }],
            parameters: Parameters { sample_count: 1 },
        };
        let body = serde_json::to_value(&request)?;
        let response = self.transport.send(&self.endpoint(credential), &body).await?;

        let parsed: PredictResponse = serde_json::from_value(response.body)
            .map_err(|err| FiestaError::malformed(&self.name, err.to_string()))?;
        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .filter(|p| p.bytes_base64_encoded.as_deref().is_some_and(|b| !b.is_empty()))
            .ok_or_else(|| FiestaError::malformed(&self.name, "no image in the response"))?;

        let data = prediction.bytes_base64_encoded.unwrap_or_default();
        let image = match prediction.mime_type {
            Some(mime_type) => ImagePayload { mime_type, data },
            None => ImagePayload::png(data),
        };
        tracing::debug!("[Imagen] Received image ({})", image.mime_type);
        Ok(Generation::Image(image))
    }
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}
