//! Error types for the Fiesta application.

use crate::model::Provider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Fiesta application.
///
/// Transport and provider variants stay local to the pane that produced
/// them; validation variants abort a whole turn before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiestaError {
    /// Upstream answered with a non-success status
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The per-request timeout elapsed
    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Response arrived but did not have the expected shape
    #[error("Malformed response from {provider}: {message}")]
    Malformed { provider: String, message: String },

    /// One or more providers needed by the active panes have no credential
    #[error("Missing API key for {}", join_providers(.providers))]
    MissingCredential { providers: Vec<Provider> },

    /// Nothing to send: blank text and no image
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// Submission with no active pane
    #[error("No active panes")]
    NoActivePanes,

    /// Submission rejected because another turn is still running
    #[error("A turn is already in progress")]
    TurnInProgress,

    /// Pane set is full
    #[error("At most {max} panes can be active")]
    PaneLimit { max: usize },

    /// Work was abandoned because a newer turn superseded it
    #[error("Cancelled")]
    Cancelled,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_providers(providers: &[Provider]) -> String {
    providers
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FiestaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Failures raised by the transport layer; these are the ones worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Network(_) | Self::Timeout { .. }
        )
    }

    /// Errors that only ever concern a single pane.
    pub fn is_pane_local(&self) -> bool {
        self.is_retryable() || matches!(self, Self::Malformed { .. })
    }

    /// Errors raised before dispatch that abort the whole turn.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::EmptyPrompt
                | Self::NoActivePanes
                | Self::TurnInProgress
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for FiestaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for FiestaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FiestaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for FiestaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, FiestaError>`.
pub type Result<T> = std::result::Result<T, FiestaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_user_facing_text() {
        let err = FiestaError::status(503, "overloaded");
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[test]
    fn test_missing_credential_lists_every_provider() {
        let err = FiestaError::MissingCredential {
            providers: vec![Provider::Google, Provider::OpenRouter],
        };
        assert_eq!(err.to_string(), "Missing API key for Gemini, OpenRouter");
        assert!(err.is_validation());
        assert!(!err.is_pane_local());
    }

    #[test]
    fn test_classification() {
        assert!(FiestaError::network("reset").is_retryable());
        assert!(FiestaError::Timeout { after_ms: 10 }.is_retryable());
        let malformed = FiestaError::malformed("gemini", "no candidates");
        assert!(!malformed.is_retryable());
        assert!(malformed.is_pane_local());
        assert!(FiestaError::Cancelled.is_cancelled());
    }
}
