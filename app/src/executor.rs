//! File-copy backup executor.
//!
//! Copies a single data file into each artifact. It does not encrypt and
//! does not compress; encrypted requests are refused so that an artifact
//! named `.encrypted` never holds plaintext.

use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::SystemTime;
use tidemark_scheduler::{BackupExecutor, BackupRequest};
use tracing::{debug, warn};

/// Writes a copy of `source` to the requested artifact path.
#[derive(Debug, Clone)]
pub struct FileCopyExecutor {
    source: PathBuf,
}

impl FileCopyExecutor {
    /// Create an executor copying `source`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl BackupExecutor for FileCopyExecutor {
    async fn execute(&self, request: &BackupRequest) -> anyhow::Result<()> {
        if request.encrypt {
            bail!("file-copy executor cannot encrypt backups");
        }
        if request.compress {
            warn!("Compression requested but not applied by file-copy executor");
        }

        let metadata = tokio::fs::metadata(&self.source)
            .await
            .with_context(|| format!("cannot read data file {}", self.source.display()))?;

        if let (true, Some(since)) = (request.is_differential, request.last_backup_time) {
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if modified <= SystemTime::from(since) {
                debug!("Data file unchanged since {}", since);
            }
        }

        let bytes = tokio::fs::copy(&self.source, &request.destination_path)
            .await
            .with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    self.source.display(),
                    request.destination_path.display()
                )
            })?;
        debug!("Copied {} bytes to {}", bytes, request.destination_path.display());
        Ok(())
    }
}

/// Stands in when no data file is configured; every job fails with a clear message.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingSourceExecutor;

#[async_trait]
impl BackupExecutor for MissingSourceExecutor {
    async fn execute(&self, _request: &BackupRequest) -> anyhow::Result<()> {
        bail!("no data file configured (set general.data_file)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tidemark_core::{BackupConfig, JobType};

    fn plain() -> BackupConfig {
        BackupConfig {
            encrypt_backups: false,
            compress_backups: false,
            ..BackupConfig::default()
        }
    }

    fn request(dest: PathBuf, config: &BackupConfig) -> BackupRequest {
        BackupRequest::new(config, dest, JobType::Full, None)
    }

    #[tokio::test]
    async fn test_copies_data_file() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("connections.json");
        std::fs::write(&source, b"{\"hosts\":[]}").unwrap();

        let config = plain();
        let dest = tmp.path().join("backup-out.json");
        FileCopyExecutor::new(&source)
            .execute(&request(dest.clone(), &config))
            .await
            .expect("copy succeeds");

        assert_eq!(std::fs::read(&dest).unwrap(), b"{\"hosts\":[]}");
    }

    #[tokio::test]
    async fn test_refuses_encryption() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("data.json");
        std::fs::write(&source, b"{}").unwrap();

        let config = BackupConfig {
            encrypt_backups: true,
            ..plain()
        };
        let dest = tmp.path().join("out.json");
        let err = FileCopyExecutor::new(&source)
            .execute(&request(dest.clone(), &config))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot encrypt"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_source_reports_path() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("absent.json");
        let err = FileCopyExecutor::new(&source)
            .execute(&request(tmp.path().join("out.json"), &plain()))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }

    #[tokio::test]
    async fn test_missing_source_executor_always_fails() {
        let tmp = TempDir::new().unwrap();
        let err = MissingSourceExecutor
            .execute(&request(tmp.path().join("out.json"), &plain()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("general.data_file"));
    }
}
