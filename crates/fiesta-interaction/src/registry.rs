use crate::adapter::ProviderAdapter;
use crate::code_adapter::GeminiCodeAdapter;
use crate::gemini_api_adapter::GeminiTextAdapter;
use crate::imagen_api_adapter::ImagenAdapter;
use crate::openrouter_api_adapter::OpenRouterAdapter;
use crate::transport::RetryingTransport;
use fiesta_core::config::EndpointConfig;
use fiesta_core::{ModelCatalog, ModelKind, Provider};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps model ids to the adapter serving them.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one adapter per catalog entry, all sharing `transport`.
    pub fn from_catalog(
        catalog: &ModelCatalog,
        transport: Arc<RetryingTransport>,
        endpoints: &EndpointConfig,
    ) -> Self {
        let mut registry = Self::new();
        for model in catalog.iter() {
            let adapter: Arc<dyn ProviderAdapter> = match (model.kind, model.provider) {
                (ModelKind::Text, Provider::Google) => Arc::new(GeminiTextAdapter::new(
                    transport.clone(),
                    &endpoints.gemini_base_url,
                    model.upstream.as_deref().unwrap_or(&endpoints.text_model),
                )),
                (ModelKind::Text, Provider::OpenRouter) => Arc::new(OpenRouterAdapter::new(
                    transport.clone(),
                    &endpoints.openrouter_url,
                    model.upstream.as_deref().unwrap_or(&model.id),
                )),
                (ModelKind::Image, Provider::Google) => Arc::new(ImagenAdapter::new(
                    transport.clone(),
                    &endpoints.gemini_base_url,
                    model.upstream.as_deref().unwrap_or(&endpoints.image_model),
                )),
                (ModelKind::Code, Provider::Google) => Arc::new(GeminiCodeAdapter::new(
                    transport.clone(),
                    &endpoints.gemini_base_url,
                    model.upstream.as_deref().unwrap_or(&endpoints.text_model),
                )),
                (kind, provider) => {
                    tracing::warn!(
                        "[Registry] No adapter for {:?} models on {}; skipping '{}'",
                        kind,
                        provider,
                        model.id
                    );
                    continue;
                }
            };
            registry.register(model.id.clone(), adapter);
        }
        registry
    }

    pub fn register(&mut self, model_id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(model_id.into(), adapter);
    }

    pub fn with(mut self, model_id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(model_id, adapter);
        self
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(model_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
