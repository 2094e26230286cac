//! Full/differential decision policy.
//!
//! A run is full when explicitly requested, when differentials are off,
//! when no full backup has completed yet, or when the number of completed
//! differentials since the last full backup reaches `full_backup_interval`.
//! Everything else is differential.

use crate::state::BackupWorkerState;
use tidemark_core::{BackupConfig, JobType};

/// Why a run was forced to be a full backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// The caller asked for a full backup
    Requested,
    /// Differential backups are disabled in the configuration
    DifferentialDisabled,
    /// No full backup has completed yet
    NoPriorFull,
    /// The differential chain reached `full_backup_interval`
    IntervalReached,
}

/// Outcome of the policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Produce a full backup
    Full(FullReason),
    /// Produce a differential backup
    Differential,
}

impl Decision {
    /// The job type this decision produces.
    #[must_use]
    pub fn job_type(self) -> JobType {
        match self {
            Self::Full(_) => JobType::Full,
            Self::Differential => JobType::Differential,
        }
    }
}

/// Decide what kind of backup the next run produces.
#[must_use]
pub fn decide(config: &BackupConfig, state: &BackupWorkerState, force_full: bool) -> Decision {
    if force_full {
        Decision::Full(FullReason::Requested)
    } else if !config.differential_enabled {
        Decision::Full(FullReason::DifferentialDisabled)
    } else if state.last_full_backup_time.is_none() {
        Decision::Full(FullReason::NoPriorFull)
    } else if state.differentials_since_full >= config.full_backup_interval.max(1) {
        Decision::Full(FullReason::IntervalReached)
    } else {
        Decision::Differential
    }
}
