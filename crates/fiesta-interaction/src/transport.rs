//! JSON-over-HTTP transport with bounded exponential backoff.

use async_trait::async_trait;
use fiesta_core::config::RetryPolicy;
use fiesta_core::{FiestaError, Result};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a request goes.
///
/// Some providers take the API key as a query parameter, so the URL is never
/// logged; `label` is used instead.
#[derive(Clone)]
pub struct Endpoint {
    label: String,
    url: String,
    headers: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Status and decoded body of one HTTP exchange.
///
/// A body that is not valid JSON is kept as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single POST with a JSON body. No retries at this level.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(&self, endpoint: &Endpoint, body: &Value) -> Result<RawResponse>;
}

/// [`HttpClient`] backed by reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FiestaError::internal(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, err: reqwest::Error) -> FiestaError {
        if err.is_timeout() {
            FiestaError::Timeout {
                after_ms: self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
            }
        } else {
            // The URL may carry an API key.
            FiestaError::network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_json(&self, endpoint: &Endpoint, body: &Value) -> Result<RawResponse> {
        let mut request = self.client.post(endpoint.url()).json(body);
        for (name, value) in endpoint.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|err| self.map_error(err))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| self.map_error(err))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(RawResponse { status, body })
    }
}

/// Sends requests through an [`HttpClient`], retrying transient failures.
///
/// Every transport failure is retryable, non-success statuses included.
/// After `n` retries the last failure is returned to the caller.
#[derive(Clone)]
pub struct RetryingTransport {
    client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Transport over reqwest, with the policy's per-request timeout.
    pub fn from_policy(policy: RetryPolicy) -> Result<Self> {
        let client = ReqwestClient::new(policy.request_timeout())?;
        Ok(Self::new(Arc::new(client), policy))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends with the configured policy.
    pub async fn send(&self, endpoint: &Endpoint, body: &Value) -> Result<RawResponse> {
        self.send_with(
            endpoint,
            body,
            self.policy.max_retries,
            self.policy.initial_delay(),
        )
        .await
    }

    /// Sends with an explicit retry budget: at most `max_retries + 1` attempts,
    /// waiting `initial_delay`, then twice that, and so on between them.
    pub async fn send_with(
        &self,
        endpoint: &Endpoint,
        body: &Value,
        max_retries: u32,
        initial_delay: Duration,
    ) -> Result<RawResponse> {
        let mut retries_left = max_retries;
        let mut delay = initial_delay;
        let mut attempt: u32 = 1;

        loop {
            let failure = match self.client.post_json(endpoint, body).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => FiestaError::status(response.status, error_message(&response.body)),
                Err(err) => err,
            };

            if retries_left == 0 || !failure.is_retryable() {
                tracing::warn!(
                    endpoint = endpoint.label(),
                    attempt,
                    "[Transport] Giving up: {}",
                    failure
                );
                return Err(failure);
            }

            tracing::debug!(
                endpoint = endpoint.label(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "[Transport] Attempt failed ({}), retrying",
                failure
            );
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            retries_left -= 1;
            attempt += 1;
        }
    }
}

/// Pulls a readable message out of an error body.
///
/// Understands the `{"error": {"status": .., "message": ..}}` shape used by
/// Google and OpenRouter and falls back to the raw body.
fn error_message(body: &Value) -> String {
    let error = body.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str);
    let status = error.and_then(|e| e.get("status")).and_then(Value::as_str);

    match (status, message) {
        (Some(status), Some(message)) if !status.is_empty() => format!("{status}: {message}"),
        (_, Some(message)) => message.to_string(),
        _ => match body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}
