//! Backup executor contract.
//!
//! The executor is the only component that touches artifact contents:
//! serialization, encryption and compression all happen behind this trait.
//! The worker hands it a fully-resolved [`BackupRequest`] and records
//! whatever error it returns verbatim on the job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tidemark_core::{BackupConfig, BackupFormat, JobType};

/// Everything the executor needs to write one artifact.
#[derive(Clone, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct BackupRequest {
    /// Full path of the artifact to write
    pub destination_path: PathBuf,
    /// Artifact serialization format
    pub format: BackupFormat,
    /// Include stored passwords
    pub include_passwords: bool,
    /// Include application settings
    pub include_settings: bool,
    /// Include SSH keys
    pub include_ssh_keys: bool,
    /// Encrypt the artifact
    pub encrypt: bool,
    /// Encryption algorithm name
    pub encryption_algorithm: String,
    /// Encryption password
    #[serde(skip)]
    pub encryption_password: Option<String>,
    /// Compress the artifact
    pub compress: bool,
    /// Only capture changes since `last_backup_time`
    pub is_differential: bool,
    /// Since-cursor for differential backups
    pub last_backup_time: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for BackupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupRequest")
            .field("destination_path", &self.destination_path)
            .field("format", &self.format)
            .field("include_passwords", &self.include_passwords)
            .field("include_settings", &self.include_settings)
            .field("include_ssh_keys", &self.include_ssh_keys)
            .field("encrypt", &self.encrypt)
            .field("encryption_algorithm", &self.encryption_algorithm)
            .field(
                "encryption_password",
                &self.encryption_password.as_ref().map(|_| "<redacted>"),
            )
            .field("compress", &self.compress)
            .field("is_differential", &self.is_differential)
            .field("last_backup_time", &self.last_backup_time)
            .finish()
    }
}

impl BackupRequest {
    /// Build a request from the configuration for one job.
    ///
    /// The since-cursor is only attached to differential jobs.
    #[must_use]
    pub fn new(
        config: &BackupConfig,
        destination_path: PathBuf,
        job_type: JobType,
        last_backup_time: Option<DateTime<Utc>>,
    ) -> Self {
        let is_differential = job_type.is_differential();
        Self {
            destination_path,
            format: config.format,
            include_passwords: config.include_passwords,
            include_settings: config.include_settings,
            include_ssh_keys: config.include_ssh_keys,
            encrypt: config.encrypt_backups,
            encryption_algorithm: config.encryption_algorithm.clone(),
            encryption_password: config.encryption_password.clone(),
            compress: config.compress_backups,
            is_differential,
            last_backup_time: if is_differential {
                last_backup_time
            } else {
                None
            },
        }
    }
}

/// Writes backup artifacts.
///
/// Implementations must be thread-safe (Send + Sync); the worker may call
/// `execute` from a background task. The worker imposes no timeout.
#[async_trait]
pub trait BackupExecutor: Send + Sync {
    /// Durably write one artifact at `request.destination_path`.
    ///
    /// # Errors
    /// Any error marks the job as failed; its message is stored on the job.
    async fn execute(&self, request: &BackupRequest) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_copies_content_flags() {
        let config = BackupConfig {
            include_passwords: true,
            include_ssh_keys: true,
            encrypt_backups: true,
            encryption_password: Some("secret".to_string()),
            compress_backups: false,
            ..BackupConfig::default()
        };
        let since = Utc.with_ymd_and_hms(2025, 1, 4, 3, 0, 0).unwrap();

        let request =
            BackupRequest::new(&config, PathBuf::from("/b/x.json"), JobType::Differential, Some(since));
        assert!(request.include_passwords);
        assert!(request.include_ssh_keys);
        assert!(request.encrypt);
        assert!(!request.compress);
        assert!(request.is_differential);
        assert_eq!(request.last_backup_time, Some(since));
        assert_eq!(request.encryption_password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_full_request_has_no_cursor() {
        let since = Utc.with_ymd_and_hms(2025, 1, 4, 3, 0, 0).unwrap();
        let request = BackupRequest::new(
            &BackupConfig::default(),
            PathBuf::from("/b/x.json"),
            JobType::Full,
            Some(since),
        );
        assert!(!request.is_differential);
        assert!(request.last_backup_time.is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = BackupConfig {
            encryption_password: Some("secret".to_string()),
            ..BackupConfig::default()
        };
        let request = BackupRequest::new(&config, PathBuf::from("/b/x.json"), JobType::Full, None);
        let debug = format!("{request:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
