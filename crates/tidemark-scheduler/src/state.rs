//! Process-wide backup worker state.
//!
//! A single `BackupWorkerState` is owned by the [`BackupWorker`](crate::BackupWorker)
//! and handed to subscribers as a snapshot after every mutation.

use crate::job::{BackupJob, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidemark_core::JobType;

/// Maximum number of finished jobs kept in [`BackupWorkerState::recent_jobs`].
pub const MAX_RECENT_JOBS: usize = 10;

/// Snapshot of the worker: schedule, live job and recent history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupWorkerState {
    /// Whether a job is live
    pub is_running: bool,
    /// Start time of the last successful backup of any kind
    pub last_backup_time: Option<DateTime<Utc>>,
    /// Start time of the last successful full backup
    pub last_full_backup_time: Option<DateTime<Utc>>,
    /// When the scheduler will next trigger a run
    pub next_scheduled_backup: Option<DateTime<Utc>>,
    /// The live job, if any
    pub current_job: Option<BackupJob>,
    /// Finished jobs, newest first
    pub recent_jobs: Vec<BackupJob>,
    /// Completed differentials since the last completed full backup
    pub differentials_since_full: u32,
    /// Number of artifacts in the destination directory
    pub backup_count: u32,
    /// Combined size of those artifacts
    pub total_size_bytes: u64,
}

impl BackupWorkerState {
    /// Record a finished job: update backup times, counters and history.
    ///
    /// Clears the live job and the running flag.
    pub(crate) fn finish_job(&mut self, job: BackupJob) {
        if job.status == JobStatus::Completed {
            self.last_backup_time = Some(job.start_time);
            match job.job_type {
                JobType::Full => {
                    self.last_full_backup_time = Some(job.start_time);
                    self.differentials_since_full = 0;
                }
                JobType::Differential => {
                    self.differentials_since_full = self.differentials_since_full.saturating_add(1);
                }
            }
        }

        self.is_running = false;
        self.current_job = None;
        self.recent_jobs.insert(0, job);
        self.recent_jobs.truncate(MAX_RECENT_JOBS);
    }

    /// The most recently finished job.
    #[must_use]
    pub fn last_job(&self) -> Option<&BackupJob> {
        self.recent_jobs.first()
    }
}
