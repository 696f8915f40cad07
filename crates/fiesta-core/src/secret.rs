//! Credential lookup.
//!
//! Defines the interface the orchestrator uses to fetch API keys. Keys are
//! opaque strings; they are never logged and never embedded in errors.

use crate::config::SecretConfig;
use crate::model::Provider;
use std::collections::HashMap;

/// Source of API keys, one per provider family.
///
/// # Security Note
///
/// Implementations must not log the returned values.
pub trait CredentialProvider: Send + Sync {
    /// Returns the key for `provider`, or `None` when none was supplied.
    fn credential(&self, provider: Provider) -> Option<String>;
}

/// In-memory credentials, e.g. keys typed into a dialog.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<Provider, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.set(provider, key);
        self
    }

    /// Stores a key; an empty key removes it.
    pub fn set(&mut self, provider: Provider, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            self.keys.remove(&provider);
        } else {
            self.keys.insert(provider, key);
        }
    }
}

impl From<&SecretConfig> for StaticCredentials {
    fn from(config: &SecretConfig) -> Self {
        let mut creds = Self::new();
        if let Some(gemini) = &config.gemini {
            creds.set(Provider::Google, gemini.api_key.clone());
        }
        if let Some(openrouter) = &config.openrouter {
            creds.set(Provider::OpenRouter, openrouter.api_key.clone());
        }
        creds
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential(&self, provider: Provider) -> Option<String> {
        self.keys.get(&provider).cloned()
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.keys.keys().collect();
        providers.sort();
        f.debug_struct("StaticCredentials")
            .field("providers", &providers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeyConfig;

    #[test]
    fn test_blank_key_counts_as_absent() {
        let creds = StaticCredentials::new()
            .with(Provider::Google, "  ")
            .with(Provider::OpenRouter, "sk-or-1");
        assert!(creds.credential(Provider::Google).is_none());
        assert_eq!(creds.credential(Provider::OpenRouter).unwrap(), "sk-or-1");
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let creds = StaticCredentials::new().with(Provider::Google, "AIza-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("AIza-secret"));
    }

    #[test]
    fn test_from_secret_config() {
        let config = SecretConfig {
            gemini: Some(ApiKeyConfig {
                api_key: "AIza".into(),
            }),
            openrouter: None,
        };
        let creds = StaticCredentials::from(&config);
        assert_eq!(creds.credential(Provider::Google).as_deref(), Some("AIza"));
        assert!(creds.credential(Provider::OpenRouter).is_none());
    }
}
