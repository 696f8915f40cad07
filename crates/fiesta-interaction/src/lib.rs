//! Upstream model access: retrying HTTP transport, provider adapters and
//! presentation pacing for text replies.

pub mod adapter;
pub mod code_adapter;
pub mod gemini_api_adapter;
pub mod imagen_api_adapter;
pub mod openrouter_api_adapter;
pub mod registry;
pub mod stream_emulator;
pub mod transport;

pub use adapter::{Generation, ProviderAdapter};
pub use code_adapter::GeminiCodeAdapter;
pub use gemini_api_adapter::GeminiTextAdapter;
pub use imagen_api_adapter::ImagenAdapter;
pub use openrouter_api_adapter::OpenRouterAdapter;
pub use registry::AdapterRegistry;
pub use stream_emulator::{InstantPacer, PresentationPacer, WordPacer, pacer_from_config};
pub use transport::{Endpoint, HttpClient, RawResponse, ReqwestClient, RetryingTransport};

#[cfg(test)]
pub(crate) mod test_support;
