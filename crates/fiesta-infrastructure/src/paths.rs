//! Unified path management for fiesta configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/fiesta/            # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── logs/                    # Application logs
//!     └── fiesta.log.YYYY-MM-DD
//! ```

use fiesta_core::config::{ApiKeyConfig, SecretConfig};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "fiesta";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for fiesta.
pub struct FiestaPaths;

impl FiestaPaths {
    /// Returns the fiesta configuration directory (e.g. `~/.config/fiesta/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Ensures the secret file exists, creating an empty template if it doesn't.
    ///
    /// On Unix the new file is created with mode 600.
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;
        write_secret_template(&secret_path)?;
        Ok(secret_path)
    }
}

pub(crate) fn write_secret_template(secret_path: &Path) -> Result<(), std::io::Error> {
    if secret_path.exists() {
        return Ok(());
    }

    if let Some(parent) = secret_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let template_config = SecretConfig {
        gemini: Some(ApiKeyConfig {
            api_key: String::new(),
        }),
        openrouter: Some(ApiKeyConfig {
            api_key: String::new(),
        }),
    };

    let template_json = serde_json::to_string_pretty(&template_config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(secret_path, template_json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(secret_path, permissions)?;
    }

    tracing::info!("[Paths] Created secret template at {:?}", secret_path);
    Ok(())
}
