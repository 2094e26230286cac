//! Configuration store contract and implementations.
//!
//! The worker never owns configuration persistence; it reads and writes
//! [`BackupConfig`] through whatever [`ConfigStore`] it was given.

use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tidemark_core::{AppConfig, BackupConfig};
use tracing::debug;

/// Persistent storage for the backup configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the stored configuration.
    async fn load(&self) -> Result<BackupConfig>;

    /// Replace the stored configuration.
    async fn save(&self, config: &BackupConfig) -> Result<()>;
}

/// In-memory store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: RwLock<BackupConfig>,
}

impl MemoryConfigStore {
    /// Create a store holding `config`.
    #[must_use]
    pub fn new(config: BackupConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<BackupConfig> {
        Ok(self.config.read().expect("config lock poisoned").clone())
    }

    async fn save(&self, config: &BackupConfig) -> Result<()> {
        *self.config.write().expect("config lock poisoned") = config.clone();
        Ok(())
    }
}

/// Store backed by the `[backup]` section of the TOML config file.
///
/// Other sections of the file are preserved on save. The encryption
/// password is never written to disk; it is kept in memory for the
/// lifetime of the store and re-attached on load.
#[derive(Debug)]
pub struct TomlConfigStore {
    path: PathBuf,
    password: RwLock<Option<String>>,
}

impl TomlConfigStore {
    /// Create a store for the config file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            password: RwLock::new(None),
        }
    }

    /// Create a store for the default XDG config path.
    pub fn at_default_path() -> Result<Self> {
        Ok(Self::new(AppConfig::config_path()?))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for TomlConfigStore {
    async fn load(&self) -> Result<BackupConfig> {
        let path = self.path.clone();
        let app = tokio::task::spawn_blocking(move || AppConfig::load_from(&path))
            .await
            .map_err(|e| SchedulerError::Store(e.to_string()))??;

        let mut config = app.backup;
        config.encryption_password = self.password.read().expect("password lock poisoned").clone();
        Ok(config)
    }

    async fn save(&self, config: &BackupConfig) -> Result<()> {
        *self.password.write().expect("password lock poisoned") =
            config.encryption_password.clone();

        let path = self.path.clone();
        let backup = config.clone();
        tokio::task::spawn_blocking(move || {
            let mut app = AppConfig::load_from(&path)?;
            app.backup = backup;
            app.save_to(&path)
        })
        .await
        .map_err(|e| SchedulerError::Store(e.to_string()))??;

        debug!("Saved backup config to {}", self.path.display());
        Ok(())
    }
}
