//! Tidemark Core - Foundation crate for the Tidemark backup engine.
//!
//! This crate provides the shared domain types, error handling and
//! configuration management that the scheduler and the application shell
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared enums and newtypes (`BackupFrequency`, `Weekday`, `ScheduledTime`, `JobType`)
//!
//! # Example
//!
//! ```rust
//! use tidemark_core::{AppConfig, BackupFrequency};
//!
//! let mut config = AppConfig::default();
//! assert!(!config.backup.is_scheduled());
//!
//! config.backup.enabled = true;
//! config.backup.frequency = BackupFrequency::Hourly;
//! assert!(config.backup.is_scheduled());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BackupConfig, GeneralConfig, SchedulerConfig};
pub use error::{ConfigError, ConfigResult, Result, TidemarkError};
pub use types::{BackupFormat, BackupFrequency, JobType, ScheduledTime, Weekday};
