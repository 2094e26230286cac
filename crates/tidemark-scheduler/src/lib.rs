//! Tidemark Scheduler - Backup scheduling, job tracking and retention.
//!
//! This crate decides when a backup runs, whether it is full or
//! differential, tracks each attempt as a job, and trims old artifacts once
//! the retention limit is exceeded. Writing the artifact itself is
//! delegated to a [`BackupExecutor`]; configuration persistence to a
//! [`ConfigStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tidemark_scheduler::{BackupWorker, MemoryConfigStore};
//!
//! let worker = Arc::new(BackupWorker::new(
//!     Arc::new(MemoryConfigStore::default()),
//!     Arc::new(my_executor),
//! ));
//! worker.initialize().await?;
//!
//! let _sub = worker.subscribe(|state| println!("running: {}", state.is_running));
//! let job = worker.run_now(false).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod bus;
pub mod clock;
pub mod error;
pub mod executor;
pub mod filename;
pub mod job;
pub mod policy;
pub mod retention;
pub mod schedule;
pub mod state;
pub mod store;
pub mod worker;

// Re-export commonly used types
pub use bus::{NotificationBus, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, SchedulerError};
pub use executor::{BackupExecutor, BackupRequest};
pub use filename::ArtifactDescriptor;
pub use job::{BackupJob, JobStatus};
pub use policy::{Decision, FullReason};
pub use retention::{BackupArtifact, RetentionReport};
pub use schedule::{is_due, next_run, ScheduleZone};
pub use state::{BackupWorkerState, MAX_RECENT_JOBS};
pub use store::{ConfigStore, MemoryConfigStore, TomlConfigStore};
pub use worker::BackupWorker;
