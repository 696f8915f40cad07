//! Gemini `generateContent` adapter for text panes.

use crate::adapter::{Generation, ProviderAdapter};
use crate::transport::{Endpoint, RetryingTransport};
use async_trait::async_trait;
use fiesta_core::{FiestaError, ImagePayload, ModelKind, Prompt, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const WEB_SEARCH_TAG: &str = "(with web search)";

/// Adapter implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiTextAdapter {
    transport: Arc<RetryingTransport>,
    base_url: String,
    model: String,
    name: String,
}

impl GeminiTextAdapter {
    pub fn new(
        transport: Arc<RetryingTransport>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            transport,
            base_url: base_url.into(),
            name: format!("gemini:{model}"),
            model,
        }
    }

    fn endpoint(&self, api_key: &str) -> Endpoint {
        Endpoint::new(
            self.name.clone(),
            format!(
                "{}/{model}:generateContent?key={api_key}",
                self.base_url.trim_end_matches('/'),
                model = self.model,
            ),
        )
    }

    /// Sends `text` (plus an optional inline image) and returns the first
    /// candidate's first text part.
    pub(crate) async fn complete(
        &self,
        text: String,
        image: Option<&ImagePayload>,
        api_key: &str,
    ) -> Result<String> {
        let request = build_request(text, image);
        let body = serde_json::to_value(&request)?;
        let response = self.transport.send(&self.endpoint(api_key), &body).await?;

        let parsed: GenerateContentResponse = serde_json::from_value(response.body)
            .map_err(|err| FiestaError::malformed(&self.name, err.to_string()))?;
        extract_text_response(parsed)
            .ok_or_else(|| FiestaError::malformed(&self.name, "no text in the first candidate"))
    }
}

#[async_trait]
impl ProviderAdapter for GeminiTextAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Text
    }

    async fn generate(&self, prompt: &Prompt, credential: &str) -> Result<Generation> {
        let text = tagged_prompt(prompt);
        let reply = self
            .complete(text, prompt.image.as_ref(), credential)
            .await?;
        Ok(Generation::Text(reply))
    }
}

/// Prompt text as sent to text models, tagged when web search is on.
pub(crate) fn tagged_prompt(prompt: &Prompt) -> String {
    if prompt.web_search {
        format!("{WEB_SEARCH_TAG} {}", prompt.text)
    } else {
        prompt.text.clone()
    }
}

fn build_request(text: String, image: Option<&ImagePayload>) -> GenerateContentRequest {
    let mut parts = vec![Part::Text { text }];
    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedClient;
    use crate::transport::RawResponse;
    use fiesta_core::config::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;

    fn adapter(client: Arc<ScriptedClient>) -> GeminiTextAdapter {
        let transport = RetryingTransport::new(client, RetryPolicy::new(0, Duration::ZERO));
        GeminiTextAdapter::new(Arc::new(transport), "https://example.test/models/", "gemini-test")
    }

    fn reply(text: &str) -> RawResponse {
        RawResponse::ok(json!({
            "candidates": [
                {"content": {"parts": [{"text": text}, {"text": "ignored"}]}},
                {"content": {"parts": [{"text": "second candidate"}]}}
            ]
        }))
    }

    #[tokio::test]
    async fn test_request_shape_with_image() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(reply("hi"))]));
        let prompt = Prompt::new("describe").with_image(ImagePayload::png("QUJD"));

        adapter(client.clone()).generate(&prompt, "KEY").await.unwrap();

        assert_eq!(
            client.last_body(),
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
                    ]
                }]
            })
        );
        assert_eq!(
            client.last_url(),
            "https://example.test/models/gemini-test:generateContent?key=KEY"
        );
    }

    #[tokio::test]
    async fn test_web_search_tags_prompt() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(reply("hi"))]));
        let prompt = Prompt::new("news today").with_web_search(true);

        adapter(client.clone()).generate(&prompt, "KEY").await.unwrap();

        assert_eq!(
            client.last_body()["contents"][0]["parts"][0]["text"],
            "(with web search) news today"
        );
    }

    #[tokio::test]
    async fn test_extracts_first_candidate_first_part() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(reply("Hello there"))]));
        let generation = adapter(client)
            .generate(&Prompt::new("Hello"), "KEY")
            .await
            .unwrap();
        assert_eq!(generation, Generation::Text("Hello there".to_string()));
    }

    #[tokio::test]
    async fn test_missing_text_is_malformed() {
        for body in [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!("not json at all"),
        ] {
            let client = Arc::new(ScriptedClient::new(vec![Ok(RawResponse::ok(body))]));
            let err = adapter(client)
                .generate(&Prompt::new("x"), "KEY")
                .await
                .unwrap_err();
            assert!(matches!(err, FiestaError::Malformed { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let client = Arc::new(ScriptedClient::always(Ok(RawResponse::new(
            500,
            json!("down"),
        ))));
        let err = adapter(client)
            .generate(&Prompt::new("x"), "KEY")
            .await
            .unwrap_err();
        assert_eq!(err, FiestaError::status(500, "down"));
    }
}
