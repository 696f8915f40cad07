//! Read-only access to `secret.json`.

use crate::paths::FiestaPaths;
use fiesta_core::config::SecretConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretStorageError {
    #[error("Could not determine home directory")]
    NoHome,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed secret file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Location of the secret file. Keys are never validated here; blank
/// `api_key` values are treated as absent by the credential provider.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    pub fn new() -> Result<Self, SecretStorageError> {
        FiestaPaths::secret_file()
            .map(Self::with_path)
            .map_err(|_| SecretStorageError::NoHome)
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(&self) -> Result<Option<SecretConfig>, SecretStorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SecretStorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SecretStorageError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
