//! Backup job definitions and lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tidemark_core::JobType;

/// Lifecycle status of a backup job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet started
    Pending,
    /// Executor is writing the artifact
    Running,
    /// Artifact written successfully
    Completed,
    /// Job ended with an error
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One execution attempt of the backup operation.
///
/// Once a job is completed or failed it no longer changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    /// Unique identifier derived from the start time
    pub id: String,
    /// Full or differential
    pub job_type: JobType,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Progress from 0 to 100
    pub progress: u8,
    /// When the job was created
    pub start_time: DateTime<Utc>,
    /// When the job reached a terminal state
    pub end_time: Option<DateTime<Utc>>,
    /// Executor or setup error for failed jobs
    pub error: Option<String>,
    /// Artifact written by a completed job
    pub file_path: Option<PathBuf>,
}

impl BackupJob {
    /// Create a pending job started at `now`.
    #[must_use]
    pub fn new(job_type: JobType, now: DateTime<Utc>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("backup-{}-{}", now.timestamp_millis(), &suffix[..8]),
            job_type,
            status: JobStatus::Pending,
            progress: 0,
            start_time: now,
            end_time: None,
            error: None,
            file_path: None,
        }
    }

    /// Whether the job has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        if !self.is_terminal() {
            self.progress = progress.min(100);
        }
    }

    pub(crate) fn complete(&mut self, file_path: PathBuf, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.end_time = Some(now);
        self.file_path = Some(file_path);
    }

    pub(crate) fn fail(&mut self, error: String, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.end_time = Some(now);
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 5, 4, 0, 0).unwrap()
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = BackupJob::new(JobType::Full, now());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.id.starts_with(&format!("backup-{}-", now().timestamp_millis())));
        assert!(job.end_time.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = BackupJob::new(JobType::Full, now());
        let b = BackupJob::new(JobType::Full, now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_complete_lifecycle() {
        let mut job = BackupJob::new(JobType::Differential, now());
        job.start();
        assert_eq!(job.status, JobStatus::Running);

        job.complete(PathBuf::from("/backups/a.json"), now());
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.file_path, Some(PathBuf::from("/backups/a.json")));
        assert_eq!(job.end_time, Some(now()));
    }

    #[test]
    fn test_terminal_jobs_are_immutable() {
        let mut job = BackupJob::new(JobType::Full, now());
        job.start();
        job.fail("disk full".to_string(), now());
        assert_eq!(job.status, JobStatus::Failed);

        job.complete(PathBuf::from("/backups/a.json"), now());
        job.set_progress(50);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("disk full"));
        assert!(job.file_path.is_none());
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&JobStatus::Running).expect("serialize");
        assert_eq!(json, "\"running\"");
    }
}
