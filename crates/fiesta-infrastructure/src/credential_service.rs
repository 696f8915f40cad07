//! Credential provider backed by secret.json and the environment.
//!
//! Priority per provider:
//! 1. `secret.json`
//! 2. Environment variables (`GEMINI_API_KEY`, `OPENROUTER_API_KEY`)

use crate::storage::{SecretStorage, SecretStorageError};
use fiesta_core::config::SecretConfig;
use fiesta_core::model::Provider;
use fiesta_core::secret::{CredentialProvider, StaticCredentials};
use std::env;
use std::sync::{Arc, RwLock};

fn env_var_for(provider: Provider) -> &'static str {
    match provider {
        Provider::Google => "GEMINI_API_KEY",
        Provider::OpenRouter => "OPENROUTER_API_KEY",
    }
}

/// [`CredentialProvider`] loading keys once and allowing in-session overrides.
#[derive(Clone)]
pub struct FileCredentialProvider {
    keys: Arc<RwLock<StaticCredentials>>,
}

impl FileCredentialProvider {
    /// Loads from the default secret file, falling back to the environment.
    pub fn load() -> Self {
        let secrets = match SecretStorage::new().and_then(|storage| storage.load()) {
            Ok(Some(secrets)) => secrets,
            Ok(None) => {
                tracing::debug!("[Credentials] No secret file, using environment only");
                SecretConfig::default()
            }
            Err(e) => {
                tracing::warn!("[Credentials] Ignoring unreadable secret file: {}", e);
                SecretConfig::default()
            }
        };
        Self::from_secrets(&secrets, |name| env::var(name).ok())
    }

    /// Loads from an explicit secret file, falling back to the environment.
    pub fn load_from(storage: &SecretStorage) -> Result<Self, SecretStorageError> {
        let secrets = storage.load()?.unwrap_or_default();
        Ok(Self::from_secrets(&secrets, |name| env::var(name).ok()))
    }

    fn from_secrets(secrets: &SecretConfig, env_lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut keys = StaticCredentials::from(secrets);
        for provider in [Provider::Google, Provider::OpenRouter] {
            if keys.credential(provider).is_none() {
                if let Some(value) = env_lookup(env_var_for(provider)) {
                    keys.set(provider, value);
                }
            }
        }
        Self {
            keys: Arc::new(RwLock::new(keys)),
        }
    }

    /// Replaces a key for the rest of the session. An empty key clears it.
    pub fn set(&self, provider: Provider, key: impl Into<String>) {
        match self.keys.write() {
            Ok(mut keys) => keys.set(provider, key),
            Err(poisoned) => poisoned.into_inner().set(provider, key),
        }
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn credential(&self, provider: Provider) -> Option<String> {
        match self.keys.read() {
            Ok(keys) => keys.credential(provider),
            Err(poisoned) => poisoned.into_inner().credential(provider),
        }
    }
}
