//! Configuration management for Tidemark.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BackupFormat, BackupFrequency, ScheduledTime, Weekday};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Highest day of month a monthly backup may target, so that every month has it.
pub const MAX_MONTHLY_DAY: u32 = 28;

/// Main application configuration.
///
/// This is loaded from `~/.config/tidemark/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Scheduler loop settings
    pub scheduler: SchedulerConfig,
    /// Backup schedule, retention and content settings
    pub backup: BackupConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if not found.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `TIDEMARK_BACKUP_ENABLED`: Override scheduled backups (true/false)
    /// - `TIDEMARK_BACKUP_DESTINATION`: Override the backup destination directory
    /// - `TIDEMARK_TICK_SECS`: Override the scheduler tick interval
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `TIDEMARK_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TIDEMARK_BACKUP_ENABLED") {
            if let Ok(enabled) = val.parse() {
                self.backup.enabled = enabled;
                tracing::debug!("Override backup.enabled from env: {}", enabled);
            }
        }

        if let Ok(val) = std::env::var("TIDEMARK_BACKUP_DESTINATION") {
            if !val.is_empty() {
                tracing::debug!("Override backup.destination_path from env: {}", val);
                self.backup.destination_path = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("TIDEMARK_TICK_SECS") {
            if let Ok(secs) = val.parse() {
                self.scheduler.tick_interval_secs = secs;
                tracing::debug!("Override scheduler.tick_interval_secs from env: {}", secs);
            }
        }
    }

    /// Save configuration to the default path.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/tidemark/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "tidemark", "tidemark").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Fallback `tracing` filter directive when `RUST_LOG` is unset
    pub log_filter: String,
    /// File whose contents the application backs up
    pub data_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,tidemark=debug".to_string(),
            data_file: None,
        }
    }
}

/// Scheduler loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scheduler checks
    pub tick_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
        }
    }
}

/// Backup schedule, retention and content settings.
///
/// Content and encryption flags are passed through untouched to the backup
/// executor; the scheduler only reads the schedule and retention fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BackupConfig {
    /// Whether scheduled backups run at all
    pub enabled: bool,
    /// How often scheduled backups run
    pub frequency: BackupFrequency,
    /// Time of day for daily, weekly and monthly backups
    pub scheduled_time: ScheduledTime,
    /// Weekday for weekly backups
    pub weekly_day: Weekday,
    /// Day of month for monthly backups (clamped to 1-28)
    pub monthly_day: u32,
    /// Directory artifacts are written to
    pub destination_path: PathBuf,
    /// Whether differential backups are produced between full ones
    pub differential_enabled: bool,
    /// Number of differentials after which a full backup is forced
    pub full_backup_interval: u32,
    /// Number of artifacts to retain (0 = unlimited)
    pub max_backups_to_keep: u32,
    /// Artifact serialization format
    pub format: BackupFormat,
    /// Include stored passwords in the artifact
    pub include_passwords: bool,
    /// Include application settings in the artifact
    pub include_settings: bool,
    /// Include SSH keys in the artifact
    pub include_ssh_keys: bool,
    /// Encrypt artifacts
    pub encrypt_backups: bool,
    /// Encryption algorithm name, interpreted by the executor
    pub encryption_algorithm: String,
    /// Encryption password (never written to disk)
    #[serde(skip)]
    pub encryption_password: Option<String>,
    /// Compress artifacts
    pub compress_backups: bool,
    /// Run one backup when the application shuts down
    pub backup_on_close: bool,
    /// Emit a notification when a backup finishes
    pub notify_on_backup: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: BackupFrequency::Daily,
            scheduled_time: ScheduledTime::default(),
            weekly_day: Weekday::Sunday,
            monthly_day: 1,
            destination_path: PathBuf::new(),
            differential_enabled: true,
            full_backup_interval: 7,
            max_backups_to_keep: 30,
            format: BackupFormat::Json,
            include_passwords: false,
            include_settings: true,
            include_ssh_keys: false,
            encrypt_backups: true,
            encryption_algorithm: "AES-256-GCM".to_string(),
            encryption_password: None,
            compress_backups: true,
            backup_on_close: false,
            notify_on_backup: true,
        }
    }
}

impl BackupConfig {
    /// Whether this configuration arms the scheduler.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.enabled && self.frequency != BackupFrequency::Manual
    }

    /// Return a copy with out-of-range values clamped.
    ///
    /// `monthly_day` is forced into 1-28 and `full_backup_interval` to at least 1.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.monthly_day = config.monthly_day.clamp(1, MAX_MONTHLY_DAY);
        config.full_backup_interval = config.full_backup_interval.max(1);
        config
    }

    /// Check that the configuration can actually produce backups.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if scheduled backups are enabled
    /// without a destination directory.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.is_scheduled() && self.destination_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backup.destination_path".to_string(),
                reason: "must not be empty when scheduled backups are enabled".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert!(!config.backup.enabled);
        assert_eq!(config.backup.frequency, BackupFrequency::Daily);
        assert_eq!(config.backup.scheduled_time.to_string(), "03:00");
        assert_eq!(config.backup.full_backup_interval, 7);
        assert_eq!(config.backup.max_backups_to_keep, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[scheduler]"));
        assert!(toml_str.contains("[backup]"));
        assert!(toml_str.contains("scheduled_time = \"03:00\""));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.backup, config.backup);
    }

    #[test]
    fn test_password_never_serialized() {
        let mut config = AppConfig::default();
        config.backup.encryption_password = Some("hunter2".to_string());
        let toml_str = toml::to_string_pretty(&config).expect("serialize config");
        assert!(!toml_str.contains("hunter2"));
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.backup.enabled = true;
        config.backup.frequency = BackupFrequency::Weekly;
        config.backup.weekly_day = Weekday::Friday;
        config.backup.destination_path = tmp.path().join("backups");

        config.save_to(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.backup.frequency, BackupFrequency::Weekly);
        assert_eq!(loaded.backup.weekly_day, Weekday::Friday);
        assert_eq!(loaded.backup.destination_path, tmp.path().join("backups"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load defaults");
        assert_eq!(loaded.backup, BackupConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[backup]
enabled = true
frequency = "monthly"
monthly_day = 31
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert!(config.backup.enabled);
        assert_eq!(config.backup.frequency, BackupFrequency::Monthly);
        assert_eq!(config.backup.monthly_day, 31);
        // These should be defaults
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert_eq!(config.backup.scheduled_time.to_string(), "03:00");
    }

    #[test]
    fn test_invalid_scheduled_time_rejected() {
        let toml_str = r#"
[backup]
scheduled_time = "25:61"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn test_normalized_clamps_monthly_day() {
        let mut config = BackupConfig {
            monthly_day: 31,
            full_backup_interval: 0,
            ..BackupConfig::default()
        };
        let normalized = config.normalized();
        assert_eq!(normalized.monthly_day, 28);
        assert_eq!(normalized.full_backup_interval, 1);

        config.monthly_day = 0;
        assert_eq!(config.normalized().monthly_day, 1);
    }

    #[test]
    fn test_is_scheduled() {
        let mut config = BackupConfig {
            enabled: true,
            ..BackupConfig::default()
        };
        assert!(config.is_scheduled());

        config.frequency = BackupFrequency::Manual;
        assert!(!config.is_scheduled());

        config.frequency = BackupFrequency::Hourly;
        config.enabled = false;
        assert!(!config.is_scheduled());
    }

    #[test]
    fn test_validate_requires_destination() {
        let config = BackupConfig {
            enabled: true,
            ..BackupConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = BackupConfig {
            enabled: true,
            destination_path: PathBuf::from("/tmp/backups"),
            ..BackupConfig::default()
        };
        assert!(config.validate().is_ok());

        // Manual configurations never need a destination up front
        assert!(BackupConfig::default().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("TIDEMARK_BACKUP_ENABLED", "true");
        std::env::set_var("TIDEMARK_TICK_SECS", "5");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert!(config.backup.enabled);
        assert_eq!(config.scheduler.tick_interval_secs, 5);

        std::env::remove_var("TIDEMARK_BACKUP_ENABLED");
        std::env::remove_var("TIDEMARK_TICK_SECS");
    }
}
