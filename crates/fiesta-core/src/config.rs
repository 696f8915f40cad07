//! Application configuration (`config.toml`) and secret (`secret.json`) models.
//!
//! Every field has a default so a missing or partial file is valid.

use crate::pane::MAX_PANES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FiestaConfig {
    pub retry: RetryPolicy,
    pub pacing: PacingConfig,
    pub endpoints: EndpointConfig,
    pub turns: TurnConfig,
    pub logging: LoggingConfig,
}

impl FiestaConfig {
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Bounded exponential backoff applied to every upstream request.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Wait before the first retry; doubled after every retry.
    pub initial_delay_ms: u64,
    /// Per-request timeout in seconds. `0` disables it.
    pub request_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay_ms: initial_delay.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Sum of all backoff waits when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        let factor = 2u64.saturating_pow(self.max_retries).saturating_sub(1);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }
}

/// Presentation pacing for emulated streaming of text replies.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PacingConfig {
    /// When false, the full reply is written in one patch.
    pub enabled: bool,
    pub min_delay_ms: u64,
    /// Exclusive upper bound of the per-word pause.
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 50,
            max_delay_ms: 100,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointConfig {
    pub gemini_base_url: String,
    /// Gemini model used for text and code panes.
    pub text_model: String,
    /// Imagen model used for image panes.
    pub image_model: String,
    pub openrouter_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            text_model: "gemini-2.5-flash-preview-05-20".to_string(),
            image_model: "imagen-3.0-generate-002".to_string(),
            openrouter_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        }
    }
}

/// What to do when a turn is submitted while another is still running.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Cancel the running turn, wait for it to wind down, then start.
    #[default]
    CancelPrevious,
    /// Refuse the new submission with `TurnInProgress`.
    Reject,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TurnConfig {
    pub overlap: OverlapPolicy,
    pub max_panes: usize,
    pub default_panes: Vec<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            overlap: OverlapPolicy::default(),
            max_panes: MAX_PANES,
            default_panes: vec!["gemini-pro-vision".to_string()],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
    /// Write logs to a daily rolling file under the config dir.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: true,
        }
    }
}

/// Contents of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ApiKeyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<ApiKeyConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyConfig {
    pub api_key: String,
}
