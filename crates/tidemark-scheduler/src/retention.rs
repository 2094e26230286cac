//! Retention enforcement for backup artifacts.
//!
//! Artifacts are identified purely by their filename (see [`crate::filename`]).
//! Files whose names don't decode are never listed and never deleted.
//! Cleanup is best-effort: a file that can't be removed is logged and
//! skipped, and the remaining deletions still happen.

use crate::filename::{self, ArtifactDescriptor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// A backup artifact found in the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupArtifact {
    /// Full path to the artifact
    pub path: PathBuf,
    /// File name within the destination directory
    pub file_name: String,
    /// Metadata decoded from the file name
    pub descriptor: ArtifactDescriptor,
    /// Size on disk
    pub size_bytes: u64,
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Artifacts left in place
    pub kept: usize,
    /// Artifacts removed
    pub deleted: Vec<PathBuf>,
    /// Artifacts that could not be removed, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

/// List the artifacts in `dir`, newest first.
///
/// # Errors
/// Returns an error if the directory itself can't be read. Individual
/// entries that can't be inspected are skipped.
pub async fn list_artifacts(dir: &Path) -> std::io::Result<Vec<BackupArtifact>> {
    let mut artifacts = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Some(descriptor) = filename::decode(&file_name) else {
            continue;
        };

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping unreadable artifact {}: {}", file_name, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        artifacts.push(BackupArtifact {
            path: entry.path(),
            file_name,
            descriptor,
            size_bytes: metadata.len(),
        });
    }

    artifacts.sort_by(|a, b| {
        b.descriptor
            .timestamp
            .cmp(&a.descriptor.timestamp)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    Ok(artifacts)
}

/// Delete all but the newest `max_to_keep` artifacts in `dir`.
///
/// `max_to_keep == 0` means unlimited and deletes nothing. Never fails:
/// listing and deletion errors are logged and reflected in the report.
pub async fn enforce(dir: &Path, max_to_keep: u32) -> RetentionReport {
    if max_to_keep == 0 {
        return RetentionReport::default();
    }

    let artifacts = match list_artifacts(dir).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!("Retention skipped, cannot list {}: {}", dir.display(), e);
            return RetentionReport::default();
        }
    };

    let keep = usize::try_from(max_to_keep).unwrap_or(usize::MAX);
    prune(artifacts, keep).await
}

/// Delete every artifact after the first `keep` of a newest-first listing.
///
/// A failed deletion is recorded and the remaining ones still run.
async fn prune(artifacts: Vec<BackupArtifact>, keep: usize) -> RetentionReport {
    let mut report = RetentionReport {
        kept: artifacts.len().min(keep),
        ..RetentionReport::default()
    };

    for artifact in artifacts.into_iter().skip(keep) {
        match fs::remove_file(&artifact.path).await {
            Ok(()) => {
                debug!("Deleted old backup {}", artifact.file_name);
                report.deleted.push(artifact.path);
            }
            Err(e) => {
                warn!("Failed to delete old backup {}: {}", artifact.file_name, e);
                report.failed.push((artifact.path, e.to_string()));
            }
        }
    }

    if !report.deleted.is_empty() || !report.failed.is_empty() {
        info!(
            kept = report.kept,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "retention pass finished"
        );
    }
    report
}
