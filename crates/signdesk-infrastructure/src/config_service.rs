//! Configuration loading.
//!
//! Reads `config.toml` (explicit path, else `~/.config/signdesk/config.toml`)
//! and caches the result. A missing file yields defaults.

use crate::paths::SignDeskPaths;
use crate::storage::write_atomic;
use signdesk_core::config::RootConfig;
use signdesk_core::error::{Result, SignDeskError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Uses `path` when given, else the platform default location.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => SignDeskPaths::config_file()?,
        };
        Ok(Self {
            path,
            config: Arc::new(RwLock::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, loading it on first use.
    ///
    /// A malformed file is a `Config` error; it is never replaced by defaults.
    pub fn get_config(&self) -> Result<RootConfig> {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = Self::load_from(&self.path)?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes a default `config.toml` unless one already exists.
    ///
    /// Returns `true` if a file was written.
    pub fn init_config(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let contents = toml::to_string_pretty(&RootConfig::default())?;
        write_atomic(&self.path, contents.as_bytes())?;
        tracing::info!(path = %self.path.display(), "Wrote default configuration");
        Ok(true)
    }

    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load_from(path: &Path) -> Result<RootConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(RootConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| {
            SignDeskError::config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Fills unset paths from the platform data directory.
pub fn resolve_paths(config: &mut RootConfig) -> Result<()> {
    if config.recognition.model_path.is_none() {
        config.recognition.model_path = Some(SignDeskPaths::model_file()?);
    }
    if config.store.path.is_none() {
        config.store.path = Some(SignDeskPaths::sessions_dir()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signdesk_core::config::StoreKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(Some(temp_dir.path().join("config.toml"))).unwrap();
        assert_eq!(service.get_config().unwrap(), RootConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[store]\nkind = \"memory\"\n\n[cache]\nttl_ms = 250\n",
        )
        .unwrap();

        let config = ConfigService::new(Some(path)).unwrap().get_config().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.cache.ttl_ms, 250);
        assert_eq!(config.cache.capacity, 50);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = ConfigService::new(Some(path)).unwrap().get_config().unwrap_err();
        assert!(matches!(err, SignDeskError::Config(_)));
    }

    #[test]
    fn test_init_config_writes_once_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let service = ConfigService::new(Some(path.clone())).unwrap();

        assert!(service.init_config().unwrap());
        assert!(!service.init_config().unwrap());
        assert!(path.exists());
        assert_eq!(service.get_config().unwrap().server.port, 5001);

        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        assert_eq!(service.get_config().unwrap().server.port, 5001);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().server.port, 9000);
    }
}
