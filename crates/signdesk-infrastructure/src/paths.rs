//! Platform path resolution.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/signdesk/          # Config directory
//! └── config.toml              # Service configuration
//!
//! ~/.local/share/signdesk/     # Data directory
//! ├── models/
//! │   └── model.json           # Classifier artifact
//! ├── sessions/                # Durable session store
//! └── logs/                    # Rolling log files
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "signdesk";

/// Errors that can occur during path resolution.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot determine the platform {0} directory")]
    DirNotFound(&'static str),
}

impl From<PathError> for signdesk_core::SignDeskError {
    fn from(err: PathError) -> Self {
        signdesk_core::SignDeskError::config(err.to_string())
    }
}

pub struct SignDeskPaths;

impl SignDeskPaths {
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("config"))
    }

    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("data"))
    }

    /// Default location of `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default classifier artifact.
    pub fn model_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("models").join("model.json"))
    }

    /// Default directory of the file-backed session store.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("sessions"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_app_dirs() {
        // Headless CI may have no home directory; only check when resolvable.
        if let (Ok(config), Ok(model)) = (SignDeskPaths::config_file(), SignDeskPaths::model_file())
        {
            assert!(config.ends_with("signdesk/config.toml"));
            assert!(model.ends_with("signdesk/models/model.json"));
        }
    }
}
