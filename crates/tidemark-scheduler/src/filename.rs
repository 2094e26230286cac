//! Artifact filename codec.
//!
//! Backup artifacts carry their own metadata in the filename:
//!
//! ```text
//! backup-2025-01-05T04-00-00-000Z-diff.encrypted.json.gz
//!        |------ timestamp -----||-d-||---enc---||fmt||gz|
//! ```
//!
//! Colons and dots of the ISO-8601 timestamp are replaced with hyphens so
//! the name is valid on every filesystem. Retention ordering relies on
//! [`decode`] recovering the timestamp that [`encode`] embedded.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tidemark_core::{BackupConfig, BackupFormat, JobType};

/// Prefix shared by every artifact filename.
pub const FILE_PREFIX: &str = "backup-";

const DIFFERENTIAL_SUFFIX: &str = "-diff";
const ENCRYPTED_MARKER: &str = ".encrypted";
const COMPRESSED_SUFFIX: &str = ".gz";

/// Metadata reconstructed from an artifact filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Instant the backup was started
    pub timestamp: DateTime<Utc>,
    /// Full or differential
    pub job_type: JobType,
    /// Whether the encrypted marker is present
    pub encrypted: bool,
    /// Artifact format taken from the extension
    pub format: BackupFormat,
    /// Whether the compression suffix is present
    pub compressed: bool,
}

/// Build the artifact filename for a job started at `timestamp`.
#[must_use]
pub fn encode(timestamp: DateTime<Utc>, job_type: JobType, config: &BackupConfig) -> String {
    let mut name = format!(
        "{FILE_PREFIX}{}",
        timestamp.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    );
    if job_type.is_differential() {
        name.push_str(DIFFERENTIAL_SUFFIX);
    }
    if config.encrypt_backups {
        name.push_str(ENCRYPTED_MARKER);
    }
    name.push('.');
    name.push_str(config.format.extension());
    if config.compress_backups {
        name.push_str(COMPRESSED_SUFFIX);
    }
    name
}

/// Parse an artifact filename.
///
/// Returns `None` for any name this codec did not produce, so unrelated
/// files in the destination directory are simply ignored.
#[must_use]
pub fn decode(file_name: &str) -> Option<ArtifactDescriptor> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX.get_or_init(|| {
        Regex::new(
            r"^backup-(\d{4}-\d{2}-\d{2})T(\d{2})-(\d{2})-(\d{2})-(\d{3})Z(-diff)?(\.encrypted)?\.(json|xml)(\.gz)?$",
        )
        .expect("valid regex")
    });

    let caps = regex.captures(file_name)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let time = NaiveTime::from_hms_milli_opt(
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
        caps[5].parse().ok()?,
    )?;
    let timestamp = NaiveDateTime::new(date, time).and_utc();

    Some(ArtifactDescriptor {
        timestamp,
        job_type: if caps.get(6).is_some() {
            JobType::Differential
        } else {
            JobType::Full
        },
        encrypted: caps.get(7).is_some(),
        format: BackupFormat::from_extension(&caps[8])?,
        compressed: caps.get(9).is_some(),
    })
}

/// Parse only the timestamp out of an artifact filename.
#[must_use]
pub fn decode_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    decode(file_name).map(|descriptor| descriptor.timestamp)
}
